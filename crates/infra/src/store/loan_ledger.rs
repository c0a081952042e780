use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use libristack_core::{BookId, DomainError, DomainResult, LoanId, UserId};
use libristack_lending::{LendingPolicy, Loan, LoanStatus};

use super::poisoned;

/// Append-only loan records.
///
/// Loans are created active and returned at most once. [`LoanLedger::reopen`]
/// undoes a return whose inventory step failed, before the per-book lock is
/// released; nothing else calls it.
pub trait LoanLedger: Send + Sync {
    fn create_loan(
        &self,
        book_id: BookId,
        borrower_id: UserId,
        borrowed_at: DateTime<Utc>,
        loan_period_days: u32,
    ) -> DomainResult<Loan>;

    fn get_loan(&self, id: LoanId) -> DomainResult<Loan>;

    /// `NotFound` if unknown, `AlreadyReturned` if not active.
    fn mark_returned(&self, id: LoanId, returned_at: DateTime<Utc>) -> DomainResult<Loan>;

    /// Extend an active loan by one period (see [`Loan::renew`]).
    fn renew_loan(
        &self,
        id: LoanId,
        now: DateTime<Utc>,
        policy: &LendingPolicy,
        pending_request: bool,
    ) -> DomainResult<Loan>;

    fn find_active_loan(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Option<Loan>>;

    fn count_active(&self, book_id: BookId) -> DomainResult<u32>;

    /// Every loan of one borrower, oldest first.
    fn list_by_borrower(&self, borrower_id: UserId) -> DomainResult<Vec<Loan>>;

    /// Every loan, optionally filtered by status, oldest first.
    fn list_all(&self, status: Option<LoanStatus>) -> DomainResult<Vec<Loan>>;

    /// Rollback of [`LoanLedger::mark_returned`].
    fn reopen(&self, id: LoanId) -> DomainResult<()>;
}

impl<S> LoanLedger for Arc<S>
where
    S: LoanLedger + ?Sized,
{
    fn create_loan(
        &self,
        book_id: BookId,
        borrower_id: UserId,
        borrowed_at: DateTime<Utc>,
        loan_period_days: u32,
    ) -> DomainResult<Loan> {
        (**self).create_loan(book_id, borrower_id, borrowed_at, loan_period_days)
    }

    fn get_loan(&self, id: LoanId) -> DomainResult<Loan> {
        (**self).get_loan(id)
    }

    fn mark_returned(&self, id: LoanId, returned_at: DateTime<Utc>) -> DomainResult<Loan> {
        (**self).mark_returned(id, returned_at)
    }

    fn renew_loan(
        &self,
        id: LoanId,
        now: DateTime<Utc>,
        policy: &LendingPolicy,
        pending_request: bool,
    ) -> DomainResult<Loan> {
        (**self).renew_loan(id, now, policy, pending_request)
    }

    fn find_active_loan(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Option<Loan>> {
        (**self).find_active_loan(book_id, borrower_id)
    }

    fn count_active(&self, book_id: BookId) -> DomainResult<u32> {
        (**self).count_active(book_id)
    }

    fn list_by_borrower(&self, borrower_id: UserId) -> DomainResult<Vec<Loan>> {
        (**self).list_by_borrower(borrower_id)
    }

    fn list_all(&self, status: Option<LoanStatus>) -> DomainResult<Vec<Loan>> {
        (**self).list_all(status)
    }

    fn reopen(&self, id: LoanId) -> DomainResult<()> {
        (**self).reopen(id)
    }
}

/// In-memory loan ledger for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLoanLedger {
    loans: RwLock<HashMap<LoanId, Loan>>,
}

impl InMemoryLoanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect(&self, keep: impl Fn(&Loan) -> bool) -> DomainResult<Vec<Loan>> {
        let loans = self.loans.read().map_err(|_| poisoned())?;
        let mut out: Vec<Loan> = loans.values().filter(|l| keep(l)).cloned().collect();
        out.sort_by_key(|l| (l.borrowed_at(), l.id_typed()));
        Ok(out)
    }

    fn modify(
        &self,
        id: LoanId,
        f: impl FnOnce(&mut Loan) -> DomainResult<()>,
    ) -> DomainResult<Loan> {
        let mut loans = self.loans.write().map_err(|_| poisoned())?;
        let stored = loans.get_mut(&id).ok_or(DomainError::NotFound)?;

        let mut next = stored.clone();
        f(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }
}

impl LoanLedger for InMemoryLoanLedger {
    fn create_loan(
        &self,
        book_id: BookId,
        borrower_id: UserId,
        borrowed_at: DateTime<Utc>,
        loan_period_days: u32,
    ) -> DomainResult<Loan> {
        let loan = Loan::open(LoanId::new(), book_id, borrower_id, borrowed_at, loan_period_days)?;
        let mut loans = self.loans.write().map_err(|_| poisoned())?;
        loans.insert(loan.id_typed(), loan.clone());
        Ok(loan)
    }

    fn get_loan(&self, id: LoanId) -> DomainResult<Loan> {
        let loans = self.loans.read().map_err(|_| poisoned())?;
        loans.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    fn mark_returned(&self, id: LoanId, returned_at: DateTime<Utc>) -> DomainResult<Loan> {
        self.modify(id, |loan| loan.mark_returned(returned_at))
    }

    fn renew_loan(
        &self,
        id: LoanId,
        now: DateTime<Utc>,
        policy: &LendingPolicy,
        pending_request: bool,
    ) -> DomainResult<Loan> {
        self.modify(id, |loan| loan.renew(now, policy, pending_request).map(|_| ()))
    }

    fn find_active_loan(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Option<Loan>> {
        let loans = self.loans.read().map_err(|_| poisoned())?;
        Ok(loans
            .values()
            .find(|l| l.is_active() && l.book_id() == book_id && l.is_held_by(borrower_id))
            .cloned())
    }

    fn count_active(&self, book_id: BookId) -> DomainResult<u32> {
        let loans = self.loans.read().map_err(|_| poisoned())?;
        let n = loans
            .values()
            .filter(|l| l.is_active() && l.book_id() == book_id)
            .count();
        u32::try_from(n).map_err(|_| DomainError::invariant("active loan count overflow"))
    }

    fn list_by_borrower(&self, borrower_id: UserId) -> DomainResult<Vec<Loan>> {
        self.collect(|l| l.is_held_by(borrower_id))
    }

    fn list_all(&self, status: Option<LoanStatus>) -> DomainResult<Vec<Loan>> {
        self.collect(|l| status.is_none_or(|s| l.status() == s))
    }

    fn reopen(&self, id: LoanId) -> DomainResult<()> {
        self.modify(id, |loan| {
            loan.reopen();
            Ok(())
        })
        .map(|_| ())
    }
}
