use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::Extension,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::post,
};

use orggate_auth::{PathClass, Role, RoleRequirement, TenantContext};

use crate::app::{blocking, dto, errors, services::AppServices};
use crate::authz;

const MANAGE_INVITES: RoleRequirement = RoleRequirement::new("invite users", &[Role::OrgAdmin]);

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_invite).get(list_invites))
        .route("/accept", post(accept_invite))
}

pub async fn create_invite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &MANAGE_INVITES, &method, class) {
        return resp;
    }
    let body: dto::CreateInviteRequest = match dto::parse_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let role = match dto::parse_role(&body.role) {
        Ok(role) => role,
        Err(resp) => return resp,
    };

    let invites = services.invites.clone();
    match blocking(move || invites.invite(&ctx, &body.email, role)).await {
        Ok(Ok(summary)) => (StatusCode::CREATED, Json(summary)).into_response(),
        Ok(Err(e)) => errors::invite_error(e),
        Err(resp) => resp,
    }
}

pub async fn list_invites(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &MANAGE_INVITES, &method, class) {
        return resp;
    }
    match services.invites.list(&ctx) {
        Ok(invites) => Json(invites).into_response(),
        Err(e) => errors::invite_error(e),
    }
}

/// Token-authenticated: no tenant context is required to accept.
pub async fn accept_invite(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::AcceptInviteRequest>,
) -> axum::response::Response {
    let invites = services.invites.clone();
    match blocking(move || invites.accept(&body.token, &body.password)).await {
        Ok(Ok(accepted)) => Json(accepted).into_response(),
        Ok(Err(e)) => errors::invite_error(e),
        Err(resp) => resp,
    }
}
