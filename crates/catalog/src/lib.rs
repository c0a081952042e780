//! Catalog domain module.
//!
//! Books and their copy counts, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod book;
pub mod import;

pub use book::{Book, BookDetails, BookDetailsPatch, DEFAULT_LANGUAGE};
pub use import::{LegacyBookRecord, LegacyPrice, parse_legacy_catalog};
