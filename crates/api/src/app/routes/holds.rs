use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};

use libristack_auth::Permission;

use crate::app::routes::common::guard;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/mine", get(my_holds))
}

/// Holds placed by the caller, oldest first.
pub async fn my_holds(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, (), vec![Permission::HOLDS_MANAGE]) {
        return resp;
    }

    match services.loans().holds_by(principal.user_id()) {
        Ok(holds) => Json(holds.iter().map(dto::hold_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
