use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use libristack_core::{BookId, UserId};

/// A borrower's pending request for a book that is out of stock.
///
/// At most one hold exists per (book, borrower). Holds are served in
/// `requested_at` order and block renewals of that book by other borrowers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub requested_at: DateTime<Utc>,
}

impl Hold {
    pub fn new(book_id: BookId, borrower_id: UserId, requested_at: DateTime<Utc>) -> Self {
        Self {
            book_id,
            borrower_id,
            requested_at,
        }
    }
}
