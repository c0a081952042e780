//! Loan orchestration (application-level).
//!
//! `LoanService` composes the inventory store, the loan ledger and the hold
//! queue, and publishes lifecycle events to an [`EventBus`].
//!
//! ## Borrow / return units
//!
//! ```text
//! borrow(principal, book, now)
//!   ↓  per-book lock
//! 1. load book              NotFound
//! 2. available > 0?         OutOfStock
//! 3. no active duplicate?   DuplicateLoan   (policy)
//! 4. decrement available ─┐
//! 5. create loan          ├─ on failure: increment back
//!   ↓  unlock              ┘
//! 6. publish LoanOpened
//! ```
//!
//! `return_book` is the mirror image: mark the loan returned, increment
//! available, and reopen the loan if the increment fails. Either both
//! mutations of a unit are visible or neither is, so
//! `available == total - active loans` holds for every book after every call.
//!
//! Events are published after the unit commits and outside the lock. A
//! failed publication is logged; the state change stands.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use libristack_auth::Principal;
use libristack_catalog::{Book, BookDetails, BookDetailsPatch};
use libristack_core::{
    AggregateRoot, BookId, DomainError, DomainResult, ExpectedVersion, LoanId, UserId,
};
use libristack_events::{Event, EventBus, EventEnvelope, Subscription};
use libristack_lending::{
    Hold, HoldCancelled, HoldPlaced, LendingPolicy, Loan, LoanEvent, LoanOpened, LoanRenewed,
    LoanReturned, LoanState, LoanStatus, classify, days_overdue,
};

use crate::locks::BookLocks;
use crate::store::{HoldQueue, InventoryStore, LoanLedger};

const LOAN_STREAM: &str = "lending.loan";
const HOLD_STREAM: &str = "lending.hold";

/// Result of a successful borrow: the new loan and the book as committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowOutcome {
    pub loan: Loan,
    pub book: Book,
}

/// Result of a successful return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub loan: Loan,
    pub book: Book,
}

/// A loan paired with its classification at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanView {
    pub loan: Loan,
    pub state: LoanState,
    pub days_overdue: i64,
}

impl LoanView {
    pub fn at(loan: Loan, now: DateTime<Utc>) -> Self {
        Self {
            state: classify(&loan, now),
            days_overdue: days_overdue(&loan, now),
            loan,
        }
    }
}

pub struct LoanService<I, L, H, B> {
    inventory: I,
    ledger: L,
    holds: H,
    bus: B,
    policy: LendingPolicy,
    locks: BookLocks,
    sequence: AtomicU64,
}

impl<I, L, H, B> LoanService<I, L, H, B>
where
    I: InventoryStore,
    L: LoanLedger,
    H: HoldQueue,
    B: EventBus<EventEnvelope<LoanEvent>>,
{
    pub fn new(inventory: I, ledger: L, holds: H, bus: B, policy: LendingPolicy) -> DomainResult<Self> {
        policy.validate()?;
        Ok(Self {
            inventory,
            ledger,
            holds,
            bus,
            policy,
            locks: BookLocks::new(),
            sequence: AtomicU64::new(0),
        })
    }

    pub fn policy(&self) -> &LendingPolicy {
        &self.policy
    }

    /// Subscribe to loan events published from now on.
    pub fn subscribe(&self) -> Subscription<EventEnvelope<LoanEvent>> {
        self.bus.subscribe()
    }

    // ---- catalog administration ----

    /// Catalogue a new book with every copy available.
    pub fn add_book(&self, details: BookDetails, total_copies: u32) -> DomainResult<Book> {
        let book = Book::new(BookId::new(), details, total_copies)?;
        self.inventory.insert_book(book.clone())?;
        tracing::info!(book_id = %book.id_typed(), total_copies, "book added");
        Ok(book)
    }

    /// Load books from an external catalog export.
    ///
    /// No loans exist for imported books yet, so their available count is
    /// reset to the total. The batch is checked as a whole first: one clashing
    /// id rejects it with `Conflict` before any book is inserted.
    pub fn import_books(&self, books: Vec<Book>) -> DomainResult<usize> {
        let mut seen = HashSet::with_capacity(books.len());
        let mut fresh = Vec::with_capacity(books.len());
        for book in books {
            let book_id = book.id_typed();
            if !seen.insert(book_id) {
                return Err(DomainError::conflict(format!(
                    "book {book_id} appears twice in the import"
                )));
            }
            match self.inventory.get_book(book_id) {
                Ok(_) => {
                    return Err(DomainError::conflict(format!(
                        "book {book_id} is already catalogued"
                    )));
                }
                Err(DomainError::NotFound) => {}
                Err(e) => return Err(e),
            }
            if book.available_copies() != book.total_copies() {
                tracing::warn!(
                    %book_id,
                    total = book.total_copies(),
                    available = book.available_copies(),
                    "imported availability ignored; no loans are recorded for this book"
                );
            }
            fresh.push(Book::new(book_id, book.details().clone(), book.total_copies())?);
        }

        let imported = fresh.len();
        for book in fresh {
            self.inventory.insert_book(book)?;
        }
        tracing::info!(imported, "catalog import finished");
        Ok(imported)
    }

    pub fn update_book(
        &self,
        book_id: BookId,
        patch: &BookDetailsPatch,
        expected: ExpectedVersion,
    ) -> DomainResult<Book> {
        let book = self.inventory.update_details(book_id, patch, expected)?;
        tracing::info!(%book_id, version = book.version(), "book details updated");
        Ok(book)
    }

    /// Change the number of copies a book has.
    ///
    /// The available count is derived as `total - active loans`. A caller
    /// may pass the available count it expects; a mismatch is rejected.
    #[tracing::instrument(skip(self))]
    pub fn set_totals(
        &self,
        book_id: BookId,
        total_copies: u32,
        available_copies: Option<u32>,
    ) -> DomainResult<Book> {
        self.locks
            .with_lock(book_id, || {
                self.inventory.get_book(book_id)?;
                let on_loan = self.ledger.count_active(book_id)?;
                if total_copies < on_loan {
                    return Err(DomainError::conflict(format!(
                        "cannot reduce total copies to {total_copies}: {on_loan} on loan"
                    )));
                }
                let derived = total_copies - on_loan;
                if available_copies.is_some_and(|a| a != derived) {
                    return Err(DomainError::validation(format!(
                        "available copies must equal total minus copies on loan ({derived})"
                    )));
                }
                self.inventory.set_totals(book_id, total_copies, derived)
            })
            .inspect(|book| {
                tracing::info!(
                    total = book.total_copies(),
                    available = book.available_copies(),
                    "copy counts changed"
                )
            })
            .inspect_err(|err| tracing::debug!(%err, "copy count change rejected"))
    }

    /// Delete a book. Rejected while any copy is on loan; pending holds go with it.
    #[tracing::instrument(skip(self))]
    pub fn remove_book(&self, book_id: BookId) -> DomainResult<Book> {
        let removed = self.locks.with_lock(book_id, || {
            let on_loan = self.ledger.count_active(book_id)?;
            if on_loan > 0 {
                return Err(DomainError::conflict(format!(
                    "book has {on_loan} active loan(s)"
                )));
            }
            let book = self.inventory.remove_book(book_id)?;
            let dropped_holds = self.holds.clear_book(book_id)?;
            Ok((book, dropped_holds))
        });
        let (book, dropped_holds) =
            removed.inspect_err(|err| tracing::debug!(%err, "book removal rejected"))?;

        tracing::info!(dropped_holds, "book removed");
        Ok(book)
    }

    pub fn get_book(&self, book_id: BookId) -> DomainResult<Book> {
        self.inventory.get_book(book_id)
    }

    pub fn list_books(&self) -> DomainResult<Vec<Book>> {
        self.inventory.list_books()
    }

    // ---- lending ----

    #[tracing::instrument(skip(self, principal), fields(borrower_id = %principal.user_id))]
    pub fn borrow(
        &self,
        principal: &Principal,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<BorrowOutcome> {
        let borrower_id = principal.user_id;

        let outcome = self
            .locks
            .with_lock(book_id, || {
                let book = self.inventory.get_book(book_id)?;
                if !book.is_available() {
                    return Err(DomainError::OutOfStock);
                }
                if self.policy.prevent_duplicate_loans
                    && self.ledger.find_active_loan(book_id, borrower_id)?.is_some()
                {
                    return Err(DomainError::DuplicateLoan);
                }

                let book = self.inventory.decrement_available(book_id)?;
                let loan = match self.ledger.create_loan(
                    book_id,
                    borrower_id,
                    now,
                    self.policy.loan_period_days,
                ) {
                    Ok(loan) => loan,
                    Err(err) => {
                        self.undo_decrement(book_id);
                        return Err(err);
                    }
                };

                if let Err(err) = self.holds.remove(book_id, borrower_id) {
                    tracing::warn!(%err, "loan opened but the borrower's hold could not be cleared");
                }
                Ok(BorrowOutcome { loan, book })
            })
            .inspect_err(|err| tracing::debug!(%err, "borrow rejected"))?;

        tracing::info!(
            loan_id = %outcome.loan.id_typed(),
            available = outcome.book.available_copies(),
            "loan opened"
        );
        self.publish(
            *outcome.loan.id_typed().as_uuid(),
            LOAN_STREAM,
            LoanEvent::LoanOpened(LoanOpened {
                loan_id: outcome.loan.id_typed(),
                book_id,
                borrower_id,
                due_at: outcome.loan.due_at(),
                occurred_at: now,
            }),
        );
        Ok(outcome)
    }

    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub fn return_book(
        &self,
        principal: &Principal,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> DomainResult<ReturnOutcome> {
        let current = self.owned_loan(principal, loan_id)?;
        let book_id = current.book_id();
        let was_overdue = classify(&current, now) == LoanState::Overdue;

        let outcome = self
            .locks
            .with_lock(book_id, || {
                let loan = self.ledger.mark_returned(loan_id, now)?;
                let book = match self.inventory.increment_available(book_id) {
                    Ok(book) => book,
                    Err(err) => {
                        if err.is_defect() {
                            tracing::error!(%err, %book_id, "inventory rejected a return; reopening loan");
                        }
                        if let Err(undo) = self.ledger.reopen(loan_id) {
                            tracing::error!(err = %undo, "failed to reopen loan after aborted return");
                        }
                        return Err(err);
                    }
                };
                Ok(ReturnOutcome { loan, book })
            })
            .inspect_err(|err| tracing::debug!(%err, "return rejected"))?;

        tracing::info!(
            %book_id,
            was_overdue,
            available = outcome.book.available_copies(),
            "loan returned"
        );
        self.publish(
            *loan_id.as_uuid(),
            LOAN_STREAM,
            LoanEvent::LoanReturned(LoanReturned {
                loan_id,
                book_id,
                borrower_id: outcome.loan.borrower_id(),
                was_overdue,
                occurred_at: now,
            }),
        );
        Ok(outcome)
    }

    /// Extend an active loan by one loan period.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub fn renew(
        &self,
        principal: &Principal,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> DomainResult<Loan> {
        let current = self.owned_loan(principal, loan_id)?;
        let book_id = current.book_id();

        let loan = self
            .locks
            .with_lock(book_id, || {
                let pending = self
                    .holds
                    .has_pending_request(book_id, current.borrower_id())?;
                self.ledger.renew_loan(loan_id, now, &self.policy, pending)
            })
            .inspect_err(|err| tracing::debug!(%err, "renewal rejected"))?;

        tracing::info!(due_at = %loan.due_at(), renewals = loan.renewals(), "loan renewed");
        self.publish(
            *loan_id.as_uuid(),
            LOAN_STREAM,
            LoanEvent::LoanRenewed(LoanRenewed {
                loan_id,
                book_id,
                borrower_id: loan.borrower_id(),
                due_at: loan.due_at(),
                renewals: loan.renewals(),
                occurred_at: now,
            }),
        );
        Ok(loan)
    }

    // ---- holds ----

    /// Join the waiting list of a book that has no copy on the shelf.
    #[tracing::instrument(skip(self, principal), fields(borrower_id = %principal.user_id))]
    pub fn place_hold(
        &self,
        principal: &Principal,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<Hold> {
        let borrower_id = principal.user_id;

        let hold = self
            .locks
            .with_lock(book_id, || {
                let book = self.inventory.get_book(book_id)?;
                if book.is_available() {
                    return Err(DomainError::validation(
                        "book has copies available; borrow it instead",
                    ));
                }
                if self.ledger.find_active_loan(book_id, borrower_id)?.is_some() {
                    return Err(DomainError::DuplicateLoan);
                }
                let hold = Hold::new(book_id, borrower_id, now);
                self.holds.place(hold.clone())?;
                Ok(hold)
            })
            .inspect_err(|err| tracing::debug!(%err, "hold rejected"))?;

        tracing::info!("hold placed");
        self.publish(
            *book_id.as_uuid(),
            HOLD_STREAM,
            LoanEvent::HoldPlaced(HoldPlaced {
                book_id,
                borrower_id,
                occurred_at: now,
            }),
        );
        Ok(hold)
    }

    #[tracing::instrument(skip(self, principal), fields(borrower_id = %principal.user_id))]
    pub fn cancel_hold(
        &self,
        principal: &Principal,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<Hold> {
        let hold = self
            .holds
            .cancel(book_id, principal.user_id)
            .inspect_err(|err| tracing::debug!(%err, "hold cancellation rejected"))?;

        tracing::info!("hold cancelled");
        self.publish(
            *book_id.as_uuid(),
            HOLD_STREAM,
            LoanEvent::HoldCancelled(HoldCancelled {
                book_id,
                borrower_id: hold.borrower_id,
                occurred_at: now,
            }),
        );
        Ok(hold)
    }

    /// Waiting list of one book, first come first served.
    pub fn holds_for(&self, book_id: BookId) -> DomainResult<Vec<Hold>> {
        self.inventory.get_book(book_id)?;
        self.holds.holds_for(book_id)
    }

    pub fn holds_by(&self, borrower_id: UserId) -> DomainResult<Vec<Hold>> {
        self.holds.holds_by(borrower_id)
    }

    // ---- read paths ----

    /// One loan, visible to its borrower and to admins.
    pub fn get_loan(
        &self,
        principal: &Principal,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> DomainResult<LoanView> {
        self.owned_loan(principal, loan_id)
            .map(|loan| LoanView::at(loan, now))
    }

    pub fn loans_for(&self, borrower_id: UserId, now: DateTime<Utc>) -> DomainResult<Vec<LoanView>> {
        Ok(self
            .ledger
            .list_by_borrower(borrower_id)?
            .into_iter()
            .map(|loan| LoanView::at(loan, now))
            .collect())
    }

    pub fn list_loans(
        &self,
        status: Option<LoanStatus>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<LoanView>> {
        Ok(self
            .ledger
            .list_all(status)?
            .into_iter()
            .map(|loan| LoanView::at(loan, now))
            .collect())
    }

    /// Active loans past their due date at `now`, oldest first.
    pub fn overdue_loans(&self, now: DateTime<Utc>) -> DomainResult<Vec<LoanView>> {
        Ok(self
            .list_loans(Some(LoanStatus::Active), now)?
            .into_iter()
            .filter(|view| view.state == LoanState::Overdue)
            .collect())
    }

    // ---- internals ----

    fn owned_loan(&self, principal: &Principal, loan_id: LoanId) -> DomainResult<Loan> {
        let loan = self.ledger.get_loan(loan_id)?;
        if !principal.can_act_for(loan.borrower_id()) {
            tracing::debug!(%loan_id, "principal does not own loan");
            return Err(DomainError::Unauthorized);
        }
        Ok(loan)
    }

    fn undo_decrement(&self, book_id: BookId) {
        if let Err(err) = self.inventory.increment_available(book_id) {
            tracing::error!(%err, %book_id, "failed to restore copy after aborted borrow");
        }
    }

    fn publish(&self, stream_id: Uuid, stream_type: &str, event: LoanEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let event_type = event.event_type();
        let envelope = EventEnvelope::wrap(stream_id, stream_type, sequence, event);
        if let Err(err) = self.bus.publish(envelope) {
            tracing::warn!(?err, event_type, sequence, "failed to publish loan event");
        }
    }
}

impl<I, L, H, B> core::fmt::Debug for LoanService<I, L, H, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoanService")
            .field("policy", &self.policy)
            .field("published", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
