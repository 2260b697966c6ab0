use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use orggate_auth::TenantContext;
use orggate_infra::StoreError;

use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/live", get(live))
        .route("/ready", get(ready))
}

pub async fn live() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Ready once the store answers.
pub async fn ready(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.db.read(|_| Ok::<_, StoreError>(())) {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "not_ready", e.to_string()),
    }
}

pub async fn whoami(Extension(ctx): Extension<TenantContext>) -> impl IntoResponse {
    Json(json!({
        "user_id": ctx.user_id(),
        "org_id": ctx.org_id(),
        "role": ctx.role(),
        "source": ctx.source().as_str(),
    }))
}
