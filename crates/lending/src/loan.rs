use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use libristack_core::{BookId, DomainError, DomainResult, Entity, LoanId, UserId};

use crate::policy::LendingPolicy;

/// Stored loan status. Overdue is derived, see [`crate::classify`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
        }
    }
}

impl core::str::FromStr for LoanStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            other => Err(DomainError::validation(format!(
                "unknown loan status '{other}' (expected active or returned)"
            ))),
        }
    }
}

/// One book copy borrowed by one user for a bounded period.
///
/// Created active; returned at most once; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    book_id: BookId,
    borrower_id: UserId,
    borrowed_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
    status: LoanStatus,
    renewals: u32,
}

impl Loan {
    /// Open a loan due `loan_period_days` after `borrowed_at`.
    pub fn open(
        id: LoanId,
        book_id: BookId,
        borrower_id: UserId,
        borrowed_at: DateTime<Utc>,
        loan_period_days: u32,
    ) -> DomainResult<Self> {
        if loan_period_days == 0 {
            return Err(DomainError::validation("loan period must be at least one day"));
        }
        let due_at = extend(borrowed_at, chrono::Duration::days(i64::from(loan_period_days)))?;
        Ok(Self {
            id,
            book_id,
            borrower_id,
            borrowed_at,
            due_at,
            returned_at: None,
            status: LoanStatus::Active,
            renewals: 0,
        })
    }

    pub fn id_typed(&self) -> LoanId {
        self.id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn borrower_id(&self) -> UserId {
        self.borrower_id
    }

    pub fn borrowed_at(&self) -> DateTime<Utc> {
        self.borrowed_at
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn renewals(&self) -> u32 {
        self.renewals
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    pub fn is_held_by(&self, borrower_id: UserId) -> bool {
        self.borrower_id == borrower_id
    }

    pub fn mark_returned(&mut self, returned_at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != LoanStatus::Active {
            return Err(DomainError::AlreadyReturned);
        }
        if returned_at < self.borrowed_at {
            return Err(DomainError::validation("return time precedes borrow time"));
        }
        self.status = LoanStatus::Returned;
        self.returned_at = Some(returned_at);
        Ok(())
    }

    /// Undo [`Loan::mark_returned`]. Rollback path only.
    pub fn reopen(&mut self) {
        self.status = LoanStatus::Active;
        self.returned_at = None;
    }

    /// Extend the due date by one loan period.
    ///
    /// `pending_request` is true when another borrower is waiting for the book.
    pub fn renew(
        &mut self,
        now: DateTime<Utc>,
        policy: &LendingPolicy,
        pending_request: bool,
    ) -> DomainResult<DateTime<Utc>> {
        if self.status != LoanStatus::Active {
            return Err(DomainError::AlreadyReturned);
        }
        if self.renewals >= policy.max_renewals {
            return Err(DomainError::RenewalLimitReached);
        }
        if pending_request {
            return Err(DomainError::HasPendingRequest);
        }
        if now > self.due_at {
            return Err(DomainError::validation("overdue loans cannot be renewed"));
        }
        self.due_at = extend(self.due_at, policy.loan_period())?;
        self.renewals += 1;
        Ok(self.due_at)
    }
}

fn extend(from: DateTime<Utc>, by: chrono::Duration) -> DomainResult<DateTime<Utc>> {
    from.checked_add_signed(by)
        .ok_or_else(|| DomainError::validation("due date is out of range"))
}

impl Entity for Loan {
    type Id = LoanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + Duration::days(n)
    }

    fn test_loan() -> Loan {
        Loan::open(LoanId::new(), BookId::new(), UserId::new(), day(0), 30).unwrap()
    }

    #[test]
    fn open_sets_due_date_from_period() {
        let loan = test_loan();
        assert_eq!(loan.due_at(), day(30));
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.returned_at(), None);
        assert_eq!(loan.renewals(), 0);
    }

    #[test]
    fn return_happens_once() {
        let mut loan = test_loan();
        loan.mark_returned(day(3)).unwrap();
        assert_eq!(loan.status(), LoanStatus::Returned);
        assert_eq!(loan.returned_at(), Some(day(3)));

        assert_eq!(loan.mark_returned(day(4)), Err(DomainError::AlreadyReturned));
        assert_eq!(loan.returned_at(), Some(day(3)));
    }

    #[test]
    fn reopen_restores_active_state() {
        let mut loan = test_loan();
        loan.mark_returned(day(3)).unwrap();
        loan.reopen();
        assert!(loan.is_active());
        assert_eq!(loan.returned_at(), None);
    }

    #[test]
    fn renewal_extends_by_one_period_and_is_limited() {
        let policy = LendingPolicy::default();
        let mut loan = test_loan();

        assert_eq!(loan.renew(day(10), &policy, false).unwrap(), day(60));
        assert_eq!(loan.renewals(), 1);
        assert_eq!(
            loan.renew(day(11), &policy, false),
            Err(DomainError::RenewalLimitReached)
        );
        assert_eq!(loan.due_at(), day(60));
    }

    #[test]
    fn renewal_blocked_by_pending_request() {
        let mut loan = test_loan();
        assert_eq!(
            loan.renew(day(1), &LendingPolicy::default(), true),
            Err(DomainError::HasPendingRequest)
        );
        assert_eq!(loan.due_at(), day(30));
    }

    #[test]
    fn overdue_loan_cannot_be_renewed() {
        let mut loan = test_loan();
        assert!(matches!(
            loan.renew(day(31), &LendingPolicy::default(), false),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Active".parse::<LoanStatus>().unwrap(), LoanStatus::Active);
        assert_eq!(" returned ".parse::<LoanStatus>().unwrap(), LoanStatus::Returned);
        assert!("overdue".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn due_date_past_the_calendar_is_rejected() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(5);
        assert!(matches!(
            Loan::open(LoanId::new(), BookId::new(), UserId::new(), late, 30),
            Err(DomainError::Validation(_))
        ));

        let policy = LendingPolicy {
            loan_period_days: 3,
            max_renewals: 5,
            ..LendingPolicy::default()
        };
        let mut loan = Loan::open(LoanId::new(), BookId::new(), UserId::new(), late, 3).unwrap();
        let due = loan.due_at();
        assert!(matches!(
            loan.renew(late, &policy, false),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(loan.due_at(), due);
        assert_eq!(loan.renewals(), 0);
    }
}
