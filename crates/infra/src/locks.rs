//! Per-book mutual exclusion.
//!
//! Every inventory/ledger unit that touches one book runs inside
//! [`BookLocks::with_lock`] for that book. Operations on different books never
//! contend on the same lock.
//!
//! An entry lives only while some caller holds or waits on it: the last one
//! out removes it. The table therefore stays bounded by the number of books
//! in flight, and a book that is removed and re-imported while a caller still
//! waits keeps sharing that caller's mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use libristack_core::BookId;

type Slot = Arc<Mutex<()>>;

#[derive(Debug, Default)]
pub struct BookLocks {
    locks: Mutex<HashMap<BookId, Slot>>,
}

/// One caller's claim on a slot. Releases it on drop, panics included.
struct Claim<'a> {
    owner: &'a BookLocks,
    book_id: BookId,
    slot: Option<Slot>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        // The map only ever holds `Arc`s, so a poisoned guard is still consistent.
        let mut locks = self.owner.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = self.slot.take() {
            // Ours plus the map's: nobody else holds or waits on it.
            if Arc::strong_count(&slot) == 2 {
                locks.remove(&self.book_id);
            }
            // Dropped under the map lock so the next claimant sees an exact count.
            drop(slot);
        }
    }
}

impl Claim<'_> {
    fn lock(&self) -> Option<MutexGuard<'_, ()>> {
        self.slot
            .as_ref()
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl BookLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&self, book_id: BookId) -> Claim<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = locks.entry(book_id).or_default().clone();
        Claim {
            owner: self,
            book_id,
            slot: Some(slot),
        }
    }

    /// Run `f` while holding the lock for `book_id`.
    pub fn with_lock<T>(&self, book_id: BookId, f: impl FnOnce() -> T) -> T {
        let claim = self.claim(book_id);
        let _guard = claim.lock();
        f()
    }

    /// Number of books that currently have a lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
