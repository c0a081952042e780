use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use libristack_catalog::{Book, BookDetailsPatch};
use libristack_core::{AggregateRoot, BookId, DomainError, DomainResult, ExpectedVersion};

use super::poisoned;

/// Book inventory: catalog records and their copy counts.
///
/// The store owns `available_copies`; every mutation re-checks
/// `0 <= available <= total` through the [`Book`] aggregate.
pub trait InventoryStore: Send + Sync {
    fn get_book(&self, id: BookId) -> DomainResult<Book>;

    /// All books, ordered by title then id.
    fn list_books(&self) -> DomainResult<Vec<Book>>;

    /// Add a new book. `Conflict` if the id is taken.
    fn insert_book(&self, book: Book) -> DomainResult<()>;

    fn update_details(
        &self,
        id: BookId,
        patch: &BookDetailsPatch,
        expected: ExpectedVersion,
    ) -> DomainResult<Book>;

    fn remove_book(&self, id: BookId) -> DomainResult<Book>;

    /// `OutOfStock` if no copy is available.
    fn decrement_available(&self, id: BookId) -> DomainResult<Book>;

    /// `OverCapacity` if every copy is already available.
    fn increment_available(&self, id: BookId) -> DomainResult<Book>;

    /// Administrative override; must satisfy `0 <= available <= total`.
    fn set_totals(&self, id: BookId, total: u32, available: u32) -> DomainResult<Book>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn get_book(&self, id: BookId) -> DomainResult<Book> {
        (**self).get_book(id)
    }

    fn list_books(&self) -> DomainResult<Vec<Book>> {
        (**self).list_books()
    }

    fn insert_book(&self, book: Book) -> DomainResult<()> {
        (**self).insert_book(book)
    }

    fn update_details(
        &self,
        id: BookId,
        patch: &BookDetailsPatch,
        expected: ExpectedVersion,
    ) -> DomainResult<Book> {
        (**self).update_details(id, patch, expected)
    }

    fn remove_book(&self, id: BookId) -> DomainResult<Book> {
        (**self).remove_book(id)
    }

    fn decrement_available(&self, id: BookId) -> DomainResult<Book> {
        (**self).decrement_available(id)
    }

    fn increment_available(&self, id: BookId) -> DomainResult<Book> {
        (**self).increment_available(id)
    }

    fn set_totals(&self, id: BookId, total: u32, available: u32) -> DomainResult<Book> {
        (**self).set_totals(id, total, available)
    }
}

/// In-memory inventory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    books: RwLock<HashMap<BookId, Book>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to one book under the write lock.
    ///
    /// `f` mutates a copy; the copy replaces the stored book only on success.
    fn modify(
        &self,
        id: BookId,
        f: impl FnOnce(&mut Book) -> DomainResult<()>,
    ) -> DomainResult<Book> {
        let mut books = self.books.write().map_err(|_| poisoned())?;
        let stored = books.get_mut(&id).ok_or(DomainError::NotFound)?;

        let mut next = stored.clone();
        f(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn get_book(&self, id: BookId) -> DomainResult<Book> {
        let books = self.books.read().map_err(|_| poisoned())?;
        books.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    fn list_books(&self) -> DomainResult<Vec<Book>> {
        let books = self.books.read().map_err(|_| poisoned())?;
        let mut all: Vec<Book> = books.values().cloned().collect();
        all.sort_by(|a, b| {
            a.title()
                .to_lowercase()
                .cmp(&b.title().to_lowercase())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(all)
    }

    fn insert_book(&self, book: Book) -> DomainResult<()> {
        let mut books = self.books.write().map_err(|_| poisoned())?;
        let id = book.id_typed();
        if books.contains_key(&id) {
            return Err(DomainError::conflict(format!("book {id} already exists")));
        }
        books.insert(id, book);
        Ok(())
    }

    fn update_details(
        &self,
        id: BookId,
        patch: &BookDetailsPatch,
        expected: ExpectedVersion,
    ) -> DomainResult<Book> {
        self.modify(id, |book| {
            expected.check(book.version())?;
            book.update_details(patch)
        })
    }

    fn remove_book(&self, id: BookId) -> DomainResult<Book> {
        let mut books = self.books.write().map_err(|_| poisoned())?;
        books.remove(&id).ok_or(DomainError::NotFound)
    }

    fn decrement_available(&self, id: BookId) -> DomainResult<Book> {
        self.modify(id, Book::take_copy)
    }

    fn increment_available(&self, id: BookId) -> DomainResult<Book> {
        self.modify(id, Book::restore_copy)
    }

    fn set_totals(&self, id: BookId, total: u32, available: u32) -> DomainResult<Book> {
        self.modify(id, |book| book.set_totals(total, available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libristack_catalog::BookDetails;

    fn store_with(total: u32) -> (InMemoryInventoryStore, BookId) {
        let store = InMemoryInventoryStore::new();
        let id = BookId::new();
        let book = Book::new(id, BookDetails::new("Middlemarch", "George Eliot"), total).unwrap();
        store.insert_book(book).unwrap();
        (store, id)
    }

    #[test]
    fn decrement_then_increment_restores_count() {
        let (store, id) = store_with(2);
        assert_eq!(store.decrement_available(id).unwrap().available_copies(), 1);
        assert_eq!(store.increment_available(id).unwrap().available_copies(), 2);
    }

    #[test]
    fn failed_mutation_leaves_stored_book_untouched() {
        let (store, id) = store_with(0);
        let before = store.get_book(id).unwrap();

        assert_eq!(store.decrement_available(id), Err(DomainError::OutOfStock));
        assert_eq!(store.increment_available(id), Err(DomainError::OverCapacity));
        assert!(store.set_totals(id, 1, 2).is_err());

        assert_eq!(store.get_book(id).unwrap(), before);
    }

    #[test]
    fn unknown_book_is_not_found() {
        let store = InMemoryInventoryStore::new();
        let id = BookId::new();
        assert_eq!(store.get_book(id), Err(DomainError::NotFound));
        assert_eq!(store.decrement_available(id), Err(DomainError::NotFound));
        assert_eq!(store.remove_book(id), Err(DomainError::NotFound));
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let (store, id) = store_with(1);
        let again = Book::new(id, BookDetails::new("Other", "Someone"), 1).unwrap();
        assert!(matches!(store.insert_book(again), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn update_details_checks_expected_version() {
        let (store, id) = store_with(1);
        let patch = BookDetailsPatch {
            genre: Some("Novel".to_string()),
            ..BookDetailsPatch::default()
        };

        assert!(matches!(
            store.update_details(id, &patch, ExpectedVersion::Exact(9)),
            Err(DomainError::Conflict(_))
        ));
        let updated = store.update_details(id, &patch, ExpectedVersion::Exact(1)).unwrap();
        assert_eq!(updated.details().genre.as_deref(), Some("Novel"));
        assert_eq!(updated.version(), 2);
    }

    #[test]
    fn list_is_sorted_by_title_case_insensitively() {
        let store = InMemoryInventoryStore::new();
        for title in ["walden", "Beloved", "Atonement"] {
            let book = Book::new(BookId::new(), BookDetails::new(title, "X"), 1).unwrap();
            store.insert_book(book).unwrap();
        }
        let titles: Vec<String> = store
            .list_books()
            .unwrap()
            .iter()
            .map(|b| b.title().to_string())
            .collect();
        assert_eq!(titles, vec!["Atonement", "Beloved", "walden"]);
    }
}
