use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
};

use orggate_auth::{PathClass, Role, RoleRequirement, TenantContext};

use crate::app::{dto, errors, services::AppServices};
use crate::authz;

const LIST_MEMBERS: RoleRequirement = RoleRequirement::any_role("list organization users");
const MANAGE_MEMBERS: RoleRequirement =
    RoleRequirement::new("manage organization users", &[Role::OrgAdmin]);

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_members))
        .route("/:user_id/role", patch(change_role))
        .route("/:user_id/deactivate", post(deactivate_member))
        .route("/:user_id/reactivate", post(reactivate_member))
}

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &LIST_MEMBERS, &method, class) {
        return resp;
    }
    match services.members.list(&ctx) {
        Ok(members) => Json(members).into_response(),
        Err(e) => errors::member_error(e),
    }
}

pub async fn change_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
    Path(user_id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &MANAGE_MEMBERS, &method, class) {
        return resp;
    }
    let body: dto::ChangeRoleRequest = match dto::parse_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let (target, role) = match (dto::parse_user_id(&user_id), dto::parse_role(&body.role)) {
        (Ok(target), Ok(role)) => (target, role),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    match services.members.change_role(&ctx, target, role) {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::member_error(e),
    }
}

/// Soft delete. The last active admin cannot be deactivated.
pub async fn deactivate_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &MANAGE_MEMBERS, &method, class) {
        return resp;
    }
    let target = match dto::parse_user_id(&user_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.members.deactivate(&ctx, target) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::member_error(e),
    }
}

pub async fn reactivate_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &MANAGE_MEMBERS, &method, class) {
        return resp;
    }
    let target = match dto::parse_user_id(&user_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.members.reactivate(&ctx, target) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::member_error(e),
    }
}
