//! Infrastructure layer: stores, per-book locking and the loan service.

pub mod loan_service;
pub mod locks;
pub mod store;

mod integration_tests;

pub use loan_service::{BorrowOutcome, LoanService, LoanView, ReturnOutcome};
pub use locks::BookLocks;
pub use store::{
    HoldQueue, InMemoryHoldQueue, InMemoryInventoryStore, InMemoryLoanLedger, InventoryStore,
    LoanLedger,
};
