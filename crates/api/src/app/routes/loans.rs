use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use libristack_auth::Permission;
use libristack_core::{BookId, LoanId};
use libristack_infra::LoanView;
use libristack_lending::LoanStatus;

use crate::app::routes::common::guard;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_loans).post(borrow))
        .route("/mine", get(my_loans))
        .route("/overdue", get(overdue_loans))
        .route("/:id", get(get_loan))
        .route("/:id/return", post(return_loan))
        .route("/:id/renew", post(renew_loan))
}

fn loans_json(views: &[LoanView]) -> axum::response::Response {
    Json(views.iter().map(dto::loan_json).collect::<Vec<_>>()).into_response()
}

pub async fn borrow(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::BorrowRequest>,
) -> axum::response::Response {
    let book_id: BookId = match guard(&principal, body, vec![Permission::LOANS_BORROW])
        .and_then(|body| errors::parse_id(&body.book_id, "book"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let now = Utc::now();
    match services.loans().borrow(principal.principal(), book_id, now) {
        Ok(out) => (
            StatusCode::CREATED,
            Json(json!({
                "loan": dto::loan_json(&LoanView::at(out.loan, now)),
                "book": dto::book_json(&out.book),
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn return_loan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let loan_id: LoanId = match guard(&principal, id, vec![Permission::LOANS_RETURN])
        .and_then(|id| errors::parse_id(&id, "loan"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let now = Utc::now();
    match services.loans().return_book(principal.principal(), loan_id, now) {
        Ok(out) => Json(json!({
            "loan": dto::loan_json(&LoanView::at(out.loan, now)),
            "book": dto::book_json(&out.book),
        }))
        .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn renew_loan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let loan_id: LoanId = match guard(&principal, id, vec![Permission::LOANS_RENEW])
        .and_then(|id| errors::parse_id(&id, "loan"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let now = Utc::now();
    match services.loans().renew(principal.principal(), loan_id, now) {
        Ok(loan) => Json(dto::loan_json(&LoanView::at(loan, now))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_loan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let loan_id: LoanId = match guard(&principal, id, vec![Permission::LOANS_READ_OWN])
        .and_then(|id| errors::parse_id(&id, "loan"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.loans().get_loan(principal.principal(), loan_id, Utc::now()) {
        Ok(view) => Json(dto::loan_json(&view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn my_loans(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, (), vec![Permission::LOANS_READ_OWN]) {
        return resp;
    }

    match services.loans().loans_for(principal.user_id(), Utc::now()) {
        Ok(views) => loans_json(&views),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_loans(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::LoanListQuery>,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, (), vec![Permission::LOANS_READ_ALL]) {
        return resp;
    }

    let status = match query.status.as_deref().map(str::parse::<LoanStatus>).transpose() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.loans().list_loans(status, Utc::now()) {
        Ok(views) => loans_json(&views),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn overdue_loans(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, (), vec![Permission::LOANS_READ_ALL]) {
        return resp;
    }

    match services.loans().overdue_loans(Utc::now()) {
        Ok(views) => loans_json(&views),
        Err(e) => errors::domain_error_to_response(e),
    }
}
