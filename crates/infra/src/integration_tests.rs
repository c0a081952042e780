//! Integration tests for the lending pipeline.
//!
//! Tests: LoanService → InventoryStore + LoanLedger → EventBus
//!
//! Verifies:
//! - Borrow/return keep `available == total - active loans`
//! - Concurrent borrows never oversubscribe a book
//! - Failed units leave every store as it was

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use libristack_auth::Principal;
    use libristack_catalog::{Book, BookDetails, BookDetailsPatch};
    use libristack_core::{BookId, DomainError, DomainResult, ExpectedVersion, LoanId, UserId};
    use libristack_events::{EventEnvelope, InMemoryEventBus};
    use libristack_lending::{LendingPolicy, Loan, LoanEvent, LoanState, LoanStatus, classify};

    use crate::loan_service::LoanService;
    use crate::store::{
        HoldQueue, InMemoryHoldQueue, InMemoryInventoryStore, InMemoryLoanLedger, InventoryStore,
        LoanLedger,
    };

    type Bus = InMemoryEventBus<EventEnvelope<LoanEvent>>;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap() + Duration::days(n)
    }

    fn member() -> Principal {
        Principal::member(UserId::new())
    }

    struct Harness {
        inventory: Arc<InMemoryInventoryStore>,
        ledger: Arc<InMemoryLoanLedger>,
        service: LoanService<
            Arc<InMemoryInventoryStore>,
            Arc<InMemoryLoanLedger>,
            InMemoryHoldQueue,
            Bus,
        >,
    }

    impl Harness {
        fn new() -> Self {
            let inventory = Arc::new(InMemoryInventoryStore::new());
            let ledger = Arc::new(InMemoryLoanLedger::new());
            let service = LoanService::new(
                inventory.clone(),
                ledger.clone(),
                InMemoryHoldQueue::new(),
                Bus::new(),
                LendingPolicy::default(),
            )
            .unwrap();
            Self {
                inventory,
                ledger,
                service,
            }
        }

        fn book(&self, copies: u32) -> BookId {
            self.service
                .add_book(BookDetails::new("Beloved", "Toni Morrison"), copies)
                .unwrap()
                .id_typed()
        }

        fn available(&self, book: BookId) -> u32 {
            self.inventory.get_book(book).unwrap().available_copies()
        }

        fn assert_counts_consistent(&self, book: BookId) {
            let stored = self.inventory.get_book(book).unwrap();
            let active = self.ledger.count_active(book).unwrap();
            assert_eq!(stored.available_copies(), stored.total_copies() - active);
        }
    }

    #[test]
    fn scenario_a_borrow_borrow_return() {
        let h = Harness::new();
        let book = h.book(3);
        let (a, b) = (member(), member());

        let loan_a = h.service.borrow(&a, book, day(0)).unwrap();
        assert_eq!(loan_a.loan.status(), LoanStatus::Active);
        assert_eq!(loan_a.book.available_copies(), 2);

        let loan_b = h.service.borrow(&b, book, day(0)).unwrap();
        assert_eq!(loan_b.book.available_copies(), 1);

        let returned = h
            .service
            .return_book(&a, loan_a.loan.id_typed(), day(3))
            .unwrap();
        assert_eq!(returned.book.available_copies(), 2);
        assert_eq!(
            h.ledger.get_loan(loan_a.loan.id_typed()).unwrap().status(),
            LoanStatus::Returned
        );
        h.assert_counts_consistent(book);
    }

    #[test]
    fn scenario_b_empty_shelf_is_out_of_stock() {
        let h = Harness::new();
        let book = h.book(1);
        h.service.borrow(&member(), book, day(0)).unwrap();
        assert_eq!(h.available(book), 0);

        let c = member();
        assert!(matches!(
            h.service.borrow(&c, book, day(1)),
            Err(DomainError::OutOfStock)
        ));
        assert_eq!(h.available(book), 0);
        assert!(h.service.loans_for(c.user_id, day(1)).unwrap().is_empty());
    }

    #[test]
    fn scenario_c_overdue_after_thirty_days() {
        let h = Harness::new();
        let book = h.book(1);
        let loan = h.service.borrow(&member(), book, day(0)).unwrap().loan;

        assert_eq!(classify(&loan, day(31)), LoanState::Overdue);
        assert_eq!(classify(&loan, day(29)), LoanState::Active);
        assert_eq!(h.service.overdue_loans(day(31)).unwrap().len(), 1);
        assert!(h.service.overdue_loans(day(29)).unwrap().is_empty());
    }

    #[test]
    fn scenario_d_second_borrow_of_same_book_is_duplicate() {
        let h = Harness::new();
        let book = h.book(2);
        let a = member();

        h.service.borrow(&a, book, day(0)).unwrap();
        assert!(matches!(
            h.service.borrow(&a, book, day(0)),
            Err(DomainError::DuplicateLoan)
        ));
        assert_eq!(h.available(book), 1);
    }

    #[test]
    fn double_return_increments_once() {
        let h = Harness::new();
        let book = h.book(2);
        let a = member();
        let loan = h.service.borrow(&a, book, day(0)).unwrap().loan;

        h.service.return_book(&a, loan.id_typed(), day(1)).unwrap();
        assert_eq!(
            h.service.return_book(&a, loan.id_typed(), day(2)),
            Err(DomainError::AlreadyReturned)
        );
        assert_eq!(h.available(book), 2);
        h.assert_counts_consistent(book);
    }

    #[test]
    fn concurrent_borrows_of_last_copy_yield_one_loan() {
        const THREADS: usize = 16;

        let h = Arc::new(Harness::new());
        let book = h.book(1);

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let h = h.clone();
                thread::spawn(move || h.service.borrow(&member(), book, day(0)).map(|_| ()))
            })
            .collect();
        let results: Vec<DomainResult<()>> =
            handles.into_iter().map(|t| t.join().unwrap()).collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let out_of_stock = results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::OutOfStock)))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(out_of_stock, THREADS - 1);
        assert_eq!(h.available(book), 0);
        h.assert_counts_consistent(book);
    }

    #[test]
    fn concurrent_borrow_return_churn_keeps_counts_consistent() {
        let h = Arc::new(Harness::new());
        let book = h.book(3);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let h = h.clone();
                thread::spawn(move || {
                    let me = member();
                    for i in 0..40 {
                        if let Ok(out) = h.service.borrow(&me, book, day(i)) {
                            h.service
                                .return_book(&me, out.loan.id_typed(), day(i))
                                .unwrap();
                        }
                    }
                })
            })
            .collect();
        for t in handles {
            t.join().unwrap();
        }

        assert_eq!(h.available(book), 3);
        h.assert_counts_consistent(book);
    }

    #[test]
    fn events_arrive_in_commit_order() {
        let h = Harness::new();
        let events = h.service.subscribe();
        let book = h.book(1);
        let a = member();

        let loan = h.service.borrow(&a, book, day(0)).unwrap().loan;
        h.service.renew(&a, loan.id_typed(), day(1)).unwrap();
        h.service.return_book(&a, loan.id_typed(), day(2)).unwrap();

        let types: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "lending.loan.opened",
                "lending.loan.renewed",
                "lending.loan.returned"
            ]
        );
    }

    #[test]
    fn admin_detail_edits_do_not_touch_counts() {
        let h = Harness::new();
        let book = h.book(2);
        h.service.borrow(&member(), book, day(0)).unwrap();

        let patch = BookDetailsPatch {
            summary: Some("A haunting novel.".to_string()),
            ..BookDetailsPatch::default()
        };
        let updated = h
            .service
            .update_book(book, &patch, ExpectedVersion::Any)
            .unwrap();
        assert_eq!(updated.available_copies(), 1);
        h.assert_counts_consistent(book);
    }

    // ---- rollback ----

    /// Ledger that refuses to open loans and to reopen them.
    #[derive(Default)]
    struct FailingLedger {
        inner: InMemoryLoanLedger,
        refuse_create: AtomicBool,
    }

    impl LoanLedger for FailingLedger {
        fn create_loan(
            &self,
            book_id: BookId,
            borrower_id: UserId,
            borrowed_at: DateTime<Utc>,
            loan_period_days: u32,
        ) -> DomainResult<Loan> {
            if self.refuse_create.load(Ordering::SeqCst) {
                return Err(DomainError::invariant("ledger unavailable"));
            }
            self.inner
                .create_loan(book_id, borrower_id, borrowed_at, loan_period_days)
        }
        fn get_loan(&self, id: LoanId) -> DomainResult<Loan> {
            self.inner.get_loan(id)
        }
        fn mark_returned(&self, id: LoanId, at: DateTime<Utc>) -> DomainResult<Loan> {
            self.inner.mark_returned(id, at)
        }
        fn renew_loan(
            &self,
            id: LoanId,
            now: DateTime<Utc>,
            policy: &LendingPolicy,
            pending: bool,
        ) -> DomainResult<Loan> {
            self.inner.renew_loan(id, now, policy, pending)
        }
        fn find_active_loan(&self, book: BookId, user: UserId) -> DomainResult<Option<Loan>> {
            self.inner.find_active_loan(book, user)
        }
        fn count_active(&self, book: BookId) -> DomainResult<u32> {
            self.inner.count_active(book)
        }
        fn list_by_borrower(&self, user: UserId) -> DomainResult<Vec<Loan>> {
            self.inner.list_by_borrower(user)
        }
        fn list_all(&self, status: Option<LoanStatus>) -> DomainResult<Vec<Loan>> {
            self.inner.list_all(status)
        }
        fn reopen(&self, id: LoanId) -> DomainResult<()> {
            self.inner.reopen(id)
        }
    }

    #[test]
    fn failed_loan_creation_restores_the_copy() {
        let inventory = Arc::new(InMemoryInventoryStore::new());
        let ledger = Arc::new(FailingLedger::default());
        let service = LoanService::new(
            inventory.clone(),
            ledger.clone(),
            InMemoryHoldQueue::new(),
            Bus::new(),
            LendingPolicy::default(),
        )
        .unwrap();
        let book = service
            .add_book(BookDetails::new("Ulysses", "James Joyce"), 1)
            .unwrap()
            .id_typed();

        ledger.refuse_create.store(true, Ordering::SeqCst);
        assert!(matches!(
            service.borrow(&member(), book, day(0)),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(inventory.get_book(book).unwrap().available_copies(), 1);
        assert!(ledger.list_all(None).unwrap().is_empty());
    }

    #[test]
    fn return_against_full_shelf_reopens_the_loan() {
        let h = Harness::new();
        let book = h.book(1);
        let a = member();
        let loan = h.service.borrow(&a, book, day(0)).unwrap().loan;

        // Put the copy back behind the service's back to force OverCapacity.
        h.inventory.increment_available(book).unwrap();

        assert_eq!(
            h.service.return_book(&a, loan.id_typed(), day(1)),
            Err(DomainError::OverCapacity)
        );
        assert!(h.ledger.get_loan(loan.id_typed()).unwrap().is_active());
        assert_eq!(h.available(book), 1);
    }

    #[test]
    fn removing_a_book_drops_its_holds() {
        let inventory = Arc::new(InMemoryInventoryStore::new());
        let holds = Arc::new(InMemoryHoldQueue::new());
        let service = LoanService::new(
            inventory,
            InMemoryLoanLedger::new(),
            holds.clone(),
            Bus::new(),
            LendingPolicy::default(),
        )
        .unwrap();
        let book = service
            .add_book(BookDetails::new("Lolita", "Vladimir Nabokov"), 1)
            .unwrap()
            .id_typed();
        let a = member();

        let loan = service.borrow(&a, book, day(0)).unwrap().loan;
        service.place_hold(&member(), book, day(1)).unwrap();
        service.return_book(&a, loan.id_typed(), day(2)).unwrap();
        service.remove_book(book).unwrap();

        assert!(holds.holds_for(book).unwrap().is_empty());
    }

    #[test]
    fn imported_catalog_is_lendable() {
        let h = Harness::new();
        let books: Vec<Book> = libristack_catalog::parse_legacy_catalog(
            r#"[{ "title": "Kindred", "author": "Octavia E. Butler", "copies": 2, "availableCopies": 0 }]"#,
        )
        .unwrap();
        let id = books[0].id_typed();

        h.service.import_books(books).unwrap();
        h.service.borrow(&member(), id, day(0)).unwrap();
        assert_eq!(h.available(id), 1);
        h.assert_counts_consistent(id);
    }

    // ---- properties ----

    #[derive(Debug, Clone)]
    enum Op {
        Borrow(usize),
        Return(usize),
        Resize(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0usize..4).prop_map(Op::Borrow),
            3 => (0usize..8).prop_map(Op::Return),
            1 => (0u32..6).prop_map(Op::Resize),
        ]
    }

    proptest! {
        /// Property: `0 <= available <= total` and
        /// `available == total - active loans` after any operation sequence.
        #[test]
        fn copy_counts_track_active_loans(
            total in 0u32..5,
            ops in prop::collection::vec(op(), 1..40),
        ) {
            let h = Harness::new();
            let book = h.book(total);
            let users: Vec<Principal> = (0..4).map(|_| member()).collect();
            let mut loans: Vec<(usize, LoanId)> = Vec::new();

            for (step, op) in ops.into_iter().enumerate() {
                let now = day(step as i64);
                match op {
                    Op::Borrow(u) => {
                        if let Ok(out) = h.service.borrow(&users[u], book, now) {
                            loans.push((u, out.loan.id_typed()));
                        }
                    }
                    Op::Return(i) => {
                        if let Some(&(u, loan_id)) = loans.get(i) {
                            let _ = h.service.return_book(&users[u], loan_id, now);
                        }
                    }
                    Op::Resize(n) => {
                        let _ = h.service.set_totals(book, n, None);
                    }
                }

                let stored = h.inventory.get_book(book).unwrap();
                let active = h.ledger.count_active(book).unwrap();
                prop_assert!(stored.available_copies() <= stored.total_copies());
                prop_assert_eq!(stored.available_copies() + active, stored.total_copies());
            }
        }
    }
}
