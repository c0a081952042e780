//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts, lending policy). Every variant describes a rejected
/// single operation; none of them is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource (book, loan, hold) was not found.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version, resource still referenced).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,

    /// No copies of the book are available.
    #[error("no copies available")]
    OutOfStock,

    /// Incrementing availability would exceed the book's total copies.
    ///
    /// This indicates a bookkeeping defect in the caller, not a user error.
    #[error("available copies would exceed total copies")]
    OverCapacity,

    /// The loan has already been returned.
    #[error("loan already returned")]
    AlreadyReturned,

    /// The borrower already holds an active loan for this book.
    #[error("borrower already has an active loan for this book")]
    DuplicateLoan,

    /// The loan has been renewed the maximum number of times.
    #[error("renewal limit reached")]
    RenewalLimitReached,

    /// Another borrower is waiting for this book.
    #[error("another borrower has a pending request for this book")]
    HasPendingRequest,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Stable machine-readable code for this error (used in API payloads and logs).
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::InvariantViolation(_) => "invariant_violation",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::NotFound => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Unauthorized => "unauthorized",
            DomainError::OutOfStock => "out_of_stock",
            DomainError::OverCapacity => "over_capacity",
            DomainError::AlreadyReturned => "already_returned",
            DomainError::DuplicateLoan => "duplicate_loan",
            DomainError::RenewalLimitReached => "renewal_limit_reached",
            DomainError::HasPendingRequest => "has_pending_request",
        }
    }

    /// Whether this error signals a defect (broken invariant) rather than a
    /// rejected request.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            DomainError::OverCapacity | DomainError::InvariantViolation(_)
        )
    }
}
