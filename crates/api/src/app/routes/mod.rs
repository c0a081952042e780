use axum::{Router, routing::get};

pub mod books;
pub mod common;
pub mod holds;
pub mod loans;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/books", books::router())
        .nest("/loans", loans::router())
        .nest("/holds", holds::router())
}
