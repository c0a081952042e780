use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use libristack_core::{BookId, DomainError, DomainResult, UserId};
use libristack_lending::Hold;

use super::poisoned;

/// Per-book waiting lists.
pub trait HoldQueue: Send + Sync {
    /// Queue a hold. `Conflict` if the borrower already waits for the book.
    fn place(&self, hold: Hold) -> DomainResult<()>;

    /// Withdraw a hold. `NotFound` if there is none.
    fn cancel(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Hold>;

    /// Like [`HoldQueue::cancel`] but absent holds are not an error.
    fn remove(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Option<Hold>>;

    /// Holds for one book in request order.
    fn holds_for(&self, book_id: BookId) -> DomainResult<Vec<Hold>>;

    /// Whether anyone other than `excluding` waits for the book.
    fn has_pending_request(&self, book_id: BookId, excluding: UserId) -> DomainResult<bool>;

    fn holds_by(&self, borrower_id: UserId) -> DomainResult<Vec<Hold>>;

    /// Drop every hold on a book; returns how many were removed.
    fn clear_book(&self, book_id: BookId) -> DomainResult<usize>;
}

impl<S> HoldQueue for Arc<S>
where
    S: HoldQueue + ?Sized,
{
    fn place(&self, hold: Hold) -> DomainResult<()> {
        (**self).place(hold)
    }

    fn cancel(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Hold> {
        (**self).cancel(book_id, borrower_id)
    }

    fn remove(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Option<Hold>> {
        (**self).remove(book_id, borrower_id)
    }

    fn holds_for(&self, book_id: BookId) -> DomainResult<Vec<Hold>> {
        (**self).holds_for(book_id)
    }

    fn has_pending_request(&self, book_id: BookId, excluding: UserId) -> DomainResult<bool> {
        (**self).has_pending_request(book_id, excluding)
    }

    fn holds_by(&self, borrower_id: UserId) -> DomainResult<Vec<Hold>> {
        (**self).holds_by(borrower_id)
    }

    fn clear_book(&self, book_id: BookId) -> DomainResult<usize> {
        (**self).clear_book(book_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryHoldQueue {
    queues: RwLock<HashMap<BookId, Vec<Hold>>>,
}

impl InMemoryHoldQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HoldQueue for InMemoryHoldQueue {
    fn place(&self, hold: Hold) -> DomainResult<()> {
        let mut queues = self.queues.write().map_err(|_| poisoned())?;
        let queue = queues.entry(hold.book_id).or_default();
        if queue.iter().any(|h| h.borrower_id == hold.borrower_id) {
            return Err(DomainError::conflict("a hold for this book already exists"));
        }
        // Keep FIFO order even if callers pass timestamps out of order.
        let at = queue.partition_point(|h| h.requested_at <= hold.requested_at);
        queue.insert(at, hold);
        Ok(())
    }

    fn cancel(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Hold> {
        self.remove(book_id, borrower_id)?
            .ok_or(DomainError::NotFound)
    }

    fn remove(&self, book_id: BookId, borrower_id: UserId) -> DomainResult<Option<Hold>> {
        let mut queues = self.queues.write().map_err(|_| poisoned())?;
        let Some(queue) = queues.get_mut(&book_id) else {
            return Ok(None);
        };
        let removed = queue
            .iter()
            .position(|h| h.borrower_id == borrower_id)
            .map(|idx| queue.remove(idx));
        if queue.is_empty() {
            queues.remove(&book_id);
        }
        Ok(removed)
    }

    fn holds_for(&self, book_id: BookId) -> DomainResult<Vec<Hold>> {
        let queues = self.queues.read().map_err(|_| poisoned())?;
        Ok(queues.get(&book_id).cloned().unwrap_or_default())
    }

    fn has_pending_request(&self, book_id: BookId, excluding: UserId) -> DomainResult<bool> {
        let queues = self.queues.read().map_err(|_| poisoned())?;
        Ok(queues
            .get(&book_id)
            .is_some_and(|q| q.iter().any(|h| h.borrower_id != excluding)))
    }

    fn holds_by(&self, borrower_id: UserId) -> DomainResult<Vec<Hold>> {
        let queues = self.queues.read().map_err(|_| poisoned())?;
        let mut out: Vec<Hold> = queues
            .values()
            .flatten()
            .filter(|h| h.borrower_id == borrower_id)
            .cloned()
            .collect();
        out.sort_by_key(|h| (h.requested_at, h.book_id));
        Ok(out)
    }

    fn clear_book(&self, book_id: BookId) -> DomainResult<usize> {
        let mut queues = self.queues.write().map_err(|_| poisoned())?;
        Ok(queues.remove(&book_id).map(|q| q.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn holds_are_served_in_request_order() {
        let queue = InMemoryHoldQueue::new();
        let book = BookId::new();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());

        queue.place(Hold::new(book, b, at(5))).unwrap();
        queue.place(Hold::new(book, a, at(1))).unwrap();
        queue.place(Hold::new(book, c, at(9))).unwrap();

        let order: Vec<UserId> = queue
            .holds_for(book)
            .unwrap()
            .iter()
            .map(|h| h.borrower_id)
            .collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn one_hold_per_borrower_and_book() {
        let queue = InMemoryHoldQueue::new();
        let (book, user) = (BookId::new(), UserId::new());
        queue.place(Hold::new(book, user, at(0))).unwrap();
        assert!(matches!(
            queue.place(Hold::new(book, user, at(1))),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn pending_request_ignores_the_asking_borrower() {
        let queue = InMemoryHoldQueue::new();
        let (book, holder, other) = (BookId::new(), UserId::new(), UserId::new());

        assert!(!queue.has_pending_request(book, holder).unwrap());
        queue.place(Hold::new(book, holder, at(0))).unwrap();
        assert!(!queue.has_pending_request(book, holder).unwrap());
        assert!(queue.has_pending_request(book, other).unwrap());
    }

    #[test]
    fn cancel_and_remove() {
        let queue = InMemoryHoldQueue::new();
        let (book, user) = (BookId::new(), UserId::new());

        assert_eq!(queue.cancel(book, user), Err(DomainError::NotFound));
        assert_eq!(queue.remove(book, user).unwrap(), None);

        queue.place(Hold::new(book, user, at(0))).unwrap();
        assert_eq!(queue.cancel(book, user).unwrap().borrower_id, user);
        assert!(queue.holds_for(book).unwrap().is_empty());
    }

    #[test]
    fn clear_book_and_holds_by() {
        let queue = InMemoryHoldQueue::new();
        let (b1, b2, user) = (BookId::new(), BookId::new(), UserId::new());
        queue.place(Hold::new(b1, user, at(3))).unwrap();
        queue.place(Hold::new(b2, user, at(1))).unwrap();
        queue.place(Hold::new(b1, UserId::new(), at(4))).unwrap();

        let mine: Vec<BookId> = queue.holds_by(user).unwrap().iter().map(|h| h.book_id).collect();
        assert_eq!(mine, vec![b2, b1]);

        assert_eq!(queue.clear_book(b1).unwrap(), 2);
        assert_eq!(queue.holds_by(user).unwrap().len(), 1);
    }
}
