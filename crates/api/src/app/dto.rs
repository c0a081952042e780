use serde::Deserialize;
use serde_json::json;

use libristack_catalog::{Book, BookDetails, BookDetailsPatch, DEFAULT_LANGUAGE};
use libristack_core::{AggregateRoot, ExpectedVersion, Money};
use libristack_infra::LoanView;
use libristack_lending::Hold;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub language: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub summary: Option<String>,
    pub cover_image: Option<String>,
    pub price_cents: Option<u64>,
    pub total_copies: u32,
}

impl CreateBookRequest {
    pub fn into_parts(self) -> (BookDetails, u32) {
        let details = BookDetails {
            title: self.title,
            author: self.author,
            language: self.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            isbn: self.isbn,
            publisher: self.publisher,
            genre: self.genre,
            summary: self.summary,
            cover_image: self.cover_image,
            price: self.price_cents.map(Money::usd_cents),
        };
        (details, self.total_copies)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub summary: Option<String>,
    pub cover_image: Option<String>,
    pub price_cents: Option<u64>,
    /// Version the client last saw; omitted means last write wins.
    pub expected_version: Option<u64>,
}

impl UpdateBookRequest {
    pub fn into_parts(self) -> (BookDetailsPatch, ExpectedVersion) {
        let patch = BookDetailsPatch {
            title: self.title,
            author: self.author,
            language: self.language,
            isbn: self.isbn,
            publisher: self.publisher,
            genre: self.genre,
            summary: self.summary,
            cover_image: self.cover_image,
            price: self.price_cents.map(Money::usd_cents),
        };
        (patch, ExpectedVersion::from(self.expected_version))
    }
}

#[derive(Debug, Deserialize)]
pub struct SetCopiesRequest {
    pub total: u32,
    pub available: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub book_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoanListQuery {
    pub status: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

fn money_json(money: &Money) -> serde_json::Value {
    json!({
        "amount_cents": money.amount_cents,
        "currency": money.currency.code(),
        "display": money.to_string(),
    })
}

pub fn book_json(book: &Book) -> serde_json::Value {
    let d = book.details();
    json!({
        "id": book.id_typed().to_string(),
        "title": d.title,
        "author": d.author,
        "language": d.language,
        "isbn": d.isbn,
        "publisher": d.publisher,
        "genre": d.genre,
        "summary": d.summary,
        "cover_image": d.cover_image,
        "price": d.price.as_ref().map(money_json),
        "total_copies": book.total_copies(),
        "available_copies": book.available_copies(),
        "version": book.version(),
    })
}

pub fn loan_json(view: &LoanView) -> serde_json::Value {
    let loan = &view.loan;
    json!({
        "id": loan.id_typed().to_string(),
        "book_id": loan.book_id().to_string(),
        "borrower_id": loan.borrower_id().to_string(),
        "borrowed_at": loan.borrowed_at(),
        "due_at": loan.due_at(),
        "returned_at": loan.returned_at(),
        "status": loan.status().as_str(),
        "state": view.state.as_str(),
        "days_overdue": view.days_overdue,
        "renewals": loan.renewals(),
    })
}

pub fn hold_json(hold: &Hold) -> serde_json::Value {
    json!({
        "book_id": hold.book_id.to_string(),
        "borrower_id": hold.borrower_id.to_string(),
        "requested_at": hold.requested_at,
    })
}
