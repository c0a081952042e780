//! Import of the legacy catalog export (`books.json`).
//!
//! The export uses camelCase keys, optional fields, numbers where strings are
//! expected (ISBNs) and prices like `"12.34 $"`. Everything is converted into
//! [`Book`] here, once; nothing downstream sees the loose shape.

use serde::{Deserialize, Deserializer};

use libristack_core::{BookId, DomainError, DomainResult, Money};

use crate::book::{Book, BookDetails, DEFAULT_LANGUAGE};

/// A price as it appears in the export: text (`"12.34 $"`) or a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LegacyPrice {
    Text(String),
    Number(f64),
}

impl LegacyPrice {
    pub fn to_money(&self) -> DomainResult<Money> {
        match self {
            LegacyPrice::Text(s) => Money::parse_legacy(s),
            LegacyPrice::Number(n) => {
                if !n.is_finite() || *n < 0.0 {
                    return Err(DomainError::validation(format!("invalid price: {n}")));
                }
                Ok(Money::usd_cents((n * 100.0).round() as u64))
            }
        }
    }
}

/// One record of the legacy export.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBookRecord {
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub publisher: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "loose_string", alias = "coverImage")]
    pub uploaded_image_url: Option<String>,
    #[serde(default)]
    pub list_price_usd: Option<LegacyPrice>,
    #[serde(default)]
    pub list_price: Option<LegacyPrice>,
    #[serde(default)]
    pub copies: Option<f64>,
    #[serde(default)]
    pub available_copies: Option<f64>,
}

impl LegacyBookRecord {
    /// Convert to a catalog book with a fresh id.
    ///
    /// Missing `copies` means one copy. `availableCopies` is advisory: it is
    /// kept only when it is a whole number no larger than `copies`, otherwise
    /// all copies count as on the shelf.
    pub fn into_book(self) -> DomainResult<Book> {
        let price = self
            .list_price_usd
            .as_ref()
            .or(self.list_price.as_ref())
            .map(LegacyPrice::to_money)
            .transpose()?;

        let total = count("copies", self.copies.unwrap_or(1.0))?;
        let available = self
            .available_copies
            .and_then(|n| count("availableCopies", n).ok())
            .filter(|&n| n <= total)
            .unwrap_or(total);

        let details = BookDetails {
            title: self.title.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            language: self.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            isbn: self.isbn,
            publisher: self.publisher,
            genre: self.genre,
            summary: self.summary,
            cover_image: self.uploaded_image_url,
            price,
        };

        Book::with_counts(BookId::new(), details, total, available)
    }
}

fn count(field: &str, n: f64) -> DomainResult<u32> {
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
        return Err(DomainError::validation(format!("{field} must be a non-negative integer")));
    }
    Ok(n as u32)
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Parse a whole export (a JSON array of records).
///
/// Fails on the first invalid record, naming its position.
pub fn parse_legacy_catalog(json: &str) -> DomainResult<Vec<Book>> {
    let records: Vec<LegacyBookRecord> = serde_json::from_str(json)
        .map_err(|e| DomainError::validation(format!("malformed catalog export: {e}")))?;

    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            record.into_book().map_err(|e| match e {
                DomainError::Validation(msg) => {
                    DomainError::validation(format!("record {idx}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_loose_record_shapes() {
        let json = r#"[
            {
                "title": "The Hobbit",
                "author": "J.R.R. Tolkien",
                "isbn": 9780547928227,
                "listPriceUsd": "14.99 $",
                "copies": 3.0,
                "availableCopies": 2.0,
                "series": "Middle-earth"
            },
            {
                "title": "Gilead",
                "author": "Marilynne Robinson",
                "language": null,
                "listPrice": 9.5
            }
        ]"#;

        let books = parse_legacy_catalog(json).unwrap();
        assert_eq!(books.len(), 2);

        let hobbit = &books[0];
        assert_eq!(hobbit.details().isbn.as_deref(), Some("9780547928227"));
        assert_eq!(hobbit.details().price, Some(Money::usd_cents(1499)));
        assert_eq!((hobbit.total_copies(), hobbit.available_copies()), (3, 2));

        let gilead = &books[1];
        assert_eq!(gilead.details().language, DEFAULT_LANGUAGE);
        assert_eq!(gilead.details().price, Some(Money::usd_cents(950)));
        assert_eq!((gilead.total_copies(), gilead.available_copies()), (1, 1));
    }

    #[test]
    fn invalid_record_is_reported_with_its_index() {
        let json = r#"[
            { "title": "Ok", "author": "A" },
            { "title": "Broken", "author": "B", "copies": -2 }
        ]"#;

        match parse_legacy_catalog(json) {
            Err(DomainError::Validation(msg)) => assert!(msg.starts_with("record 1:"), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn fractional_copy_counts_are_rejected() {
        let record = LegacyBookRecord {
            title: Some("T".into()),
            author: Some("A".into()),
            copies: Some(1.5),
            ..LegacyBookRecord::default()
        };
        assert!(matches!(record.into_book(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn unusable_available_count_does_not_reject_the_record() {
        let json = r#"[
            { "title": "Emma", "author": "Jane Austen", "copies": 1, "availableCopies": 4 },
            { "title": "Persuasion", "author": "Jane Austen", "copies": 2, "availableCopies": 0.5 }
        ]"#;

        let books = parse_legacy_catalog(json).unwrap();
        assert_eq!((books[0].total_copies(), books[0].available_copies()), (1, 1));
        assert_eq!((books[1].total_copies(), books[1].available_copies()), (2, 2));
    }
}
