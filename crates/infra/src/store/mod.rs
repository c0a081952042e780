//! Storage boundaries for books, loans and holds.
//!
//! Each trait is a narrow, synchronous contract; every single call is atomic.
//! Multi-step units (borrow, return) are made atomic by [`crate::LoanService`]
//! under per-book exclusion.

pub mod holds;
pub mod inventory;
pub mod loan_ledger;

pub use holds::{HoldQueue, InMemoryHoldQueue};
pub use inventory::{InMemoryInventoryStore, InventoryStore};
pub use loan_ledger::{InMemoryLoanLedger, LoanLedger};

use libristack_core::DomainError;

pub(crate) fn poisoned() -> DomainError {
    DomainError::invariant("store lock poisoned")
}
