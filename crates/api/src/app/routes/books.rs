use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use libristack_auth::Permission;
use libristack_core::BookId;

use crate::app::routes::common::guard;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/:id", get(get_book).patch(update_book).delete(remove_book))
        .route("/:id/copies", put(set_copies))
        .route(
            "/:id/holds",
            get(list_holds).post(place_hold).delete(cancel_hold),
        )
}

pub async fn list_books(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, (), vec![Permission::CATALOG_READ]) {
        return resp;
    }

    match services.loans().list_books() {
        Ok(books) => Json(books.iter().map(dto::book_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let book_id: BookId = match guard(&principal, id, vec![Permission::CATALOG_READ])
        .and_then(|id| errors::parse_id(&id, "book"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.loans().get_book(book_id) {
        Ok(book) => Json(dto::book_json(&book)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateBookRequest>,
) -> axum::response::Response {
    let body = match guard(&principal, body, vec![Permission::CATALOG_MANAGE]) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let (details, total) = body.into_parts();
    match services.loans().add_book(details, total) {
        Ok(book) => (StatusCode::CREATED, Json(dto::book_json(&book))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateBookRequest>,
) -> axum::response::Response {
    let body = match guard(&principal, body, vec![Permission::CATALOG_MANAGE]) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let book_id: BookId = match errors::parse_id(&id, "book") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let (patch, expected) = body.into_parts();
    match services.loans().update_book(book_id, &patch, expected) {
        Ok(book) => Json(dto::book_json(&book)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn set_copies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetCopiesRequest>,
) -> axum::response::Response {
    let body = match guard(&principal, body, vec![Permission::CATALOG_MANAGE]) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let book_id: BookId = match errors::parse_id(&id, "book") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.loans().set_totals(book_id, body.total, body.available) {
        Ok(book) => Json(dto::book_json(&book)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn remove_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let book_id: BookId = match guard(&principal, id, vec![Permission::CATALOG_MANAGE])
        .and_then(|id| errors::parse_id(&id, "book"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.loans().remove_book(book_id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ---- holds ----

pub async fn list_holds(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let book_id: BookId = match guard(&principal, id, vec![Permission::LOANS_READ_ALL])
        .and_then(|id| errors::parse_id(&id, "book"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.loans().holds_for(book_id) {
        Ok(holds) => Json(holds.iter().map(dto::hold_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn place_hold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let book_id: BookId = match guard(&principal, id, vec![Permission::HOLDS_MANAGE])
        .and_then(|id| errors::parse_id(&id, "book"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .loans()
        .place_hold(principal.principal(), book_id, Utc::now())
    {
        Ok(hold) => (StatusCode::CREATED, Json(dto::hold_json(&hold))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn cancel_hold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let book_id: BookId = match guard(&principal, id, vec![Permission::HOLDS_MANAGE])
        .and_then(|id| errors::parse_id(&id, "book"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .loans()
        .cancel_hold(principal.principal(), book_id, Utc::now())
    {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
