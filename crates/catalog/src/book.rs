use serde::{Deserialize, Serialize};

use libristack_core::{AggregateRoot, BookId, DomainError, DomainResult, Money};

/// Language recorded when a book is added without one.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Descriptive catalog metadata for a book.
///
/// Required fields are plain values; everything else is optional. Defaults are
/// applied once via [`BookDetails::normalized`], never at read sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl BookDetails {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            language: default_language(),
            isbn: None,
            publisher: None,
            genre: None,
            summary: None,
            cover_image: None,
            price: None,
        }
    }

    /// Trim text, drop blank optionals, default the language and validate
    /// required fields.
    pub fn normalized(self) -> DomainResult<Self> {
        let title = self.title.trim().to_string();
        let author = self.author.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if author.is_empty() {
            return Err(DomainError::validation("author cannot be empty"));
        }

        let language = match self.language.trim() {
            "" => default_language(),
            l => l.to_string(),
        };

        Ok(Self {
            title,
            author,
            language,
            isbn: non_blank(self.isbn),
            publisher: non_blank(self.publisher),
            genre: non_blank(self.genre),
            summary: non_blank(self.summary),
            cover_image: non_blank(self.cover_image),
            price: self.price,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Partial update of [`BookDetails`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetailsPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub summary: Option<String>,
    pub cover_image: Option<String>,
    pub price: Option<Money>,
}

impl BookDetailsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce the patched details (normalized).
    pub fn apply_to(&self, current: &BookDetails) -> DomainResult<BookDetails> {
        let pick = |patch: &Option<String>, cur: &Option<String>| patch.clone().or_else(|| cur.clone());
        BookDetails {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            author: self.author.clone().unwrap_or_else(|| current.author.clone()),
            language: self.language.clone().unwrap_or_else(|| current.language.clone()),
            isbn: pick(&self.isbn, &current.isbn),
            publisher: pick(&self.publisher, &current.publisher),
            genre: pick(&self.genre, &current.genre),
            summary: pick(&self.summary, &current.summary),
            cover_image: pick(&self.cover_image, &current.cover_image),
            price: self.price.or(current.price),
        }
        .normalized()
    }
}

/// Aggregate root: Book.
///
/// Owns the copy counts. Invariant: `available_copies <= total_copies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    details: BookDetails,
    total_copies: u32,
    available_copies: u32,
    version: u64,
}

impl Book {
    /// A newly catalogued book with every copy on the shelf.
    pub fn new(id: BookId, details: BookDetails, total_copies: u32) -> DomainResult<Self> {
        Ok(Self {
            id,
            details: details.normalized()?,
            total_copies,
            available_copies: total_copies,
            version: 1,
        })
    }

    /// Rebuild a book with explicit counts (e.g. from an import).
    pub fn with_counts(
        id: BookId,
        details: BookDetails,
        total_copies: u32,
        available_copies: u32,
    ) -> DomainResult<Self> {
        ensure_counts(total_copies, available_copies)?;
        let mut book = Self::new(id, details, total_copies)?;
        book.available_copies = available_copies;
        Ok(book)
    }

    pub fn id_typed(&self) -> BookId {
        self.id
    }

    pub fn details(&self) -> &BookDetails {
        &self.details
    }

    pub fn title(&self) -> &str {
        &self.details.title
    }

    pub fn author(&self) -> &str {
        &self.details.author
    }

    pub fn total_copies(&self) -> u32 {
        self.total_copies
    }

    pub fn available_copies(&self) -> u32 {
        self.available_copies
    }

    /// Copies currently out on loan.
    pub fn copies_on_loan(&self) -> u32 {
        self.total_copies - self.available_copies
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Take one copy off the shelf.
    pub fn take_copy(&mut self) -> DomainResult<()> {
        if self.available_copies == 0 {
            return Err(DomainError::OutOfStock);
        }
        self.available_copies -= 1;
        self.version += 1;
        Ok(())
    }

    /// Put one copy back on the shelf.
    pub fn restore_copy(&mut self) -> DomainResult<()> {
        if self.available_copies >= self.total_copies {
            return Err(DomainError::OverCapacity);
        }
        self.available_copies += 1;
        self.version += 1;
        Ok(())
    }

    /// Administrative override of both counts.
    pub fn set_totals(&mut self, total_copies: u32, available_copies: u32) -> DomainResult<()> {
        ensure_counts(total_copies, available_copies)?;
        self.total_copies = total_copies;
        self.available_copies = available_copies;
        self.version += 1;
        Ok(())
    }

    pub fn update_details(&mut self, patch: &BookDetailsPatch) -> DomainResult<()> {
        if patch.is_empty() {
            return Err(DomainError::validation("patch contains no changes"));
        }
        self.details = patch.apply_to(&self.details)?;
        self.version += 1;
        Ok(())
    }
}

fn ensure_counts(total_copies: u32, available_copies: u32) -> DomainResult<()> {
    if available_copies > total_copies {
        return Err(DomainError::validation(format!(
            "available copies ({available_copies}) cannot exceed total copies ({total_copies})"
        )));
    }
    Ok(())
}

impl AggregateRoot for Book {
    type Id = BookId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_book(total: u32) -> Book {
        Book::new(BookId::new(), BookDetails::new("Dune", "Frank Herbert"), total).unwrap()
    }

    #[test]
    fn new_book_has_every_copy_available() {
        let book = test_book(3);
        assert_eq!(book.total_copies(), 3);
        assert_eq!(book.available_copies(), 3);
        assert_eq!(book.copies_on_loan(), 0);
        assert_eq!(book.version(), 1);
        assert_eq!(book.details().language, DEFAULT_LANGUAGE);
    }

    #[test]
    fn take_copy_fails_when_shelf_is_empty() {
        let mut book = test_book(1);
        book.take_copy().unwrap();
        assert_eq!(book.take_copy(), Err(DomainError::OutOfStock));
        assert_eq!(book.available_copies(), 0);
    }

    #[test]
    fn restore_copy_fails_when_everything_is_on_the_shelf() {
        let mut book = test_book(2);
        assert_eq!(book.restore_copy(), Err(DomainError::OverCapacity));
        assert_eq!(book.available_copies(), 2);
        assert_eq!(book.version(), 1);
    }

    #[test]
    fn set_totals_rejects_available_above_total() {
        let mut book = test_book(2);
        let err = book.set_totals(2, 3).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        book.set_totals(5, 4).unwrap();
        assert_eq!((book.total_copies(), book.available_copies()), (5, 4));
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Book::new(BookId::new(), BookDetails::new("   ", "Someone"), 1).unwrap_err();
        assert_eq!(err, DomainError::validation("title cannot be empty"));
    }

    #[test]
    fn normalization_trims_and_drops_blank_optionals() {
        let mut details = BookDetails::new("  Emma ", " Jane Austen");
        details.language = "  ".to_string();
        details.isbn = Some("   ".to_string());
        details.genre = Some(" Classic ".to_string());

        let details = details.normalized().unwrap();
        assert_eq!(details.title, "Emma");
        assert_eq!(details.author, "Jane Austen");
        assert_eq!(details.language, DEFAULT_LANGUAGE);
        assert_eq!(details.isbn, None);
        assert_eq!(details.genre.as_deref(), Some("Classic"));
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut book = test_book(1);
        let patch = BookDetailsPatch {
            price: Some(Money::usd_cents(999)),
            genre: Some("Science Fiction".to_string()),
            ..BookDetailsPatch::default()
        };
        book.update_details(&patch).unwrap();

        assert_eq!(book.title(), "Dune");
        assert_eq!(book.details().price, Some(Money::usd_cents(999)));
        assert_eq!(book.details().genre.as_deref(), Some("Science Fiction"));
        assert_eq!(book.version(), 2);
    }

    #[test]
    fn empty_patch_is_rejected() {
        let mut book = test_book(1);
        assert!(matches!(
            book.update_details(&BookDetailsPatch::default()),
            Err(DomainError::Validation(_))
        ));
    }

    proptest! {
        /// Property: any sequence of take/restore keeps 0 <= available <= total.
        #[test]
        fn counts_stay_within_bounds(
            total in 0u32..8,
            ops in prop::collection::vec(any::<bool>(), 0..64)
        ) {
            let mut book = test_book(total);
            for take in ops {
                let _ = if take { book.take_copy() } else { book.restore_copy() };
                prop_assert!(book.available_copies() <= book.total_copies());
            }
        }
    }
}
