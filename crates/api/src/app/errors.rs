use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use libristack_auth::AuthzError;
use libristack_core::DomainError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::OutOfStock
        | DomainError::AlreadyReturned
        | DomainError::DuplicateLoan
        | DomainError::RenewalLimitReached
        | DomainError::HasPendingRequest
        | DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
        DomainError::Unauthorized => StatusCode::FORBIDDEN,
        DomainError::OverCapacity | DomainError::InvariantViolation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if err.is_defect() {
        tracing::error!("request failed on an internal invariant: {err}");
    }

    json_error(status, err.code(), err.to_string())
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path id, mapping failures to a 400 `invalid_id` response.
pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr,
{
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}
