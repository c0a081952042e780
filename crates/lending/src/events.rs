use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use libristack_core::{BookId, LoanId, UserId};
use libristack_events::Event;

/// Event: LoanOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOpened {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub due_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReturned {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub was_overdue: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanRenewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRenewed {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub due_at: DateTime<Utc>,
    pub renewals: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: HoldPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldPlaced {
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: HoldCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldCancelled {
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanEvent {
    LoanOpened(LoanOpened),
    LoanReturned(LoanReturned),
    LoanRenewed(LoanRenewed),
    HoldPlaced(HoldPlaced),
    HoldCancelled(HoldCancelled),
}

impl LoanEvent {
    /// The book the event concerns.
    pub fn book_id(&self) -> BookId {
        match self {
            LoanEvent::LoanOpened(e) => e.book_id,
            LoanEvent::LoanReturned(e) => e.book_id,
            LoanEvent::LoanRenewed(e) => e.book_id,
            LoanEvent::HoldPlaced(e) => e.book_id,
            LoanEvent::HoldCancelled(e) => e.book_id,
        }
    }

    /// The borrower the event concerns.
    pub fn borrower_id(&self) -> UserId {
        match self {
            LoanEvent::LoanOpened(e) => e.borrower_id,
            LoanEvent::LoanReturned(e) => e.borrower_id,
            LoanEvent::LoanRenewed(e) => e.borrower_id,
            LoanEvent::HoldPlaced(e) => e.borrower_id,
            LoanEvent::HoldCancelled(e) => e.borrower_id,
        }
    }
}

impl Event for LoanEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LoanEvent::LoanOpened(_) => "lending.loan.opened",
            LoanEvent::LoanReturned(_) => "lending.loan.returned",
            LoanEvent::LoanRenewed(_) => "lending.loan.renewed",
            LoanEvent::HoldPlaced(_) => "lending.hold.placed",
            LoanEvent::HoldCancelled(_) => "lending.hold.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LoanEvent::LoanOpened(e) => e.occurred_at,
            LoanEvent::LoanReturned(e) => e.occurred_at,
            LoanEvent::LoanRenewed(e) => e.occurred_at,
            LoanEvent::HoldPlaced(e) => e.occurred_at,
            LoanEvent::HoldCancelled(e) => e.occurred_at,
        }
    }
}
