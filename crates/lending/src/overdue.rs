//! Overdue classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::loan::{Loan, LoanStatus};

/// Where a loan stands at a given instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    Active,
    Overdue,
    Returned,
}

impl LoanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::Active => "active",
            LoanState::Overdue => "overdue",
            LoanState::Returned => "returned",
        }
    }
}

/// Classify `loan` at `now`. Pure and deterministic.
pub fn classify(loan: &Loan, now: DateTime<Utc>) -> LoanState {
    match loan.status() {
        LoanStatus::Returned => LoanState::Returned,
        LoanStatus::Active if loan.due_at() < now => LoanState::Overdue,
        LoanStatus::Active => LoanState::Active,
    }
}

/// Whole days past due (0 unless overdue).
pub fn days_overdue(loan: &Loan, now: DateTime<Utc>) -> i64 {
    match classify(loan, now) {
        LoanState::Overdue => (now - loan.due_at()).num_days(),
        _ => 0,
    }
}
