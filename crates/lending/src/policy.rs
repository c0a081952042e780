use chrono::Duration;
use serde::{Deserialize, Serialize};

use libristack_core::{DomainError, DomainResult};

/// Lending rules applied by the loan service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingPolicy {
    /// Length of a loan (and of each renewal), in days.
    pub loan_period_days: u32,
    /// How many times one loan may be renewed.
    pub max_renewals: u32,
    /// Reject a borrow when the borrower already has the same book out.
    pub prevent_duplicate_loans: bool,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: 30,
            max_renewals: 1,
            prevent_duplicate_loans: true,
        }
    }
}

impl LendingPolicy {
    /// Longest loan period accepted (ten years).
    pub const MAX_LOAN_PERIOD_DAYS: u32 = 3650;
    /// Most renewals a policy may allow per loan.
    pub const MAX_RENEWALS: u32 = 100;

    pub fn validate(&self) -> DomainResult<()> {
        if self.loan_period_days == 0 {
            return Err(DomainError::validation("loan period must be at least one day"));
        }
        if self.loan_period_days > Self::MAX_LOAN_PERIOD_DAYS {
            return Err(DomainError::validation(format!(
                "loan period cannot exceed {} days",
                Self::MAX_LOAN_PERIOD_DAYS
            )));
        }
        if self.max_renewals > Self::MAX_RENEWALS {
            return Err(DomainError::validation(format!(
                "max renewals cannot exceed {}",
                Self::MAX_RENEWALS
            )));
        }
        Ok(())
    }

    pub fn loan_period(&self) -> Duration {
        Duration::days(i64::from(self.loan_period_days))
    }
}
