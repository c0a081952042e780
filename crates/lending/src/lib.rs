//! Lending domain module: the loan lifecycle (borrow → due → return/overdue).
//!
//! Pure, deterministic domain logic. Callers supply the current time; nothing
//! here reads a clock or touches storage.

pub mod events;
pub mod hold;
pub mod loan;
pub mod overdue;
pub mod policy;

pub use events::{HoldCancelled, HoldPlaced, LoanEvent, LoanOpened, LoanRenewed, LoanReturned};
pub use hold::Hold;
pub use loan::{Loan, LoanStatus};
pub use overdue::{LoanState, classify, days_overdue};
pub use policy::LendingPolicy;
