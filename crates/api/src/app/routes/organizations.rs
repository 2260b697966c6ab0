use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::Extension,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
};

use orggate_auth::{Identity, PathClass, Role, RoleRequirement, TenantContext};
use orggate_core::SettingsPatch;
use orggate_infra::UnauthenticatedReason;
use orggate_infra::services::CreateOrganization;

use crate::app::routes::{invites, members};
use crate::app::{blocking, dto, errors, services::AppServices};
use crate::authz;

const VIEW_SETTINGS: RoleRequirement = RoleRequirement::any_role("view organization settings");
const UPDATE_SETTINGS: RoleRequirement =
    RoleRequirement::new("update organization settings", &[Role::OrgAdmin]);
const RETIRE: RoleRequirement = RoleRequirement::new("delete the organization", &[Role::OrgAdmin]);

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_organization))
        .route("/settings", get(get_settings).patch(update_settings))
        .route("/current", delete(retire_organization))
        .nest("/invites", invites::router())
        .nest("/users", members::router())
}

/// The creator comes from the resolved identity, or for bootstrap from
/// credentials in the body.
pub async fn create_organization(
    Extension(services): Extension<Arc<AppServices>>,
    identity: Option<Extension<Identity>>,
    Json(body): Json<dto::CreateOrganizationRequest>,
) -> axum::response::Response {
    let request = CreateOrganization {
        name: body.name,
        country: body.country,
        base_currency: body.base_currency,
        timezone: body.timezone,
    };

    let creator = match (identity, body.creator) {
        (Some(Extension(identity)), _) => identity.user_id,
        (None, Some(creds)) => {
            let accounts = services.accounts.clone();
            match blocking(move || accounts.verify_credentials(&creds.username_or_email, &creds.password)).await {
                Ok(Ok(user)) => user.id,
                Ok(Err(e)) => return errors::account_error(e),
                Err(resp) => return resp,
            }
        }
        (None, None) => return errors::unauthenticated(UnauthenticatedReason::NoCredentials),
    };

    match services.organizations.create(request, creator) {
        Ok(org) => (StatusCode::CREATED, Json(org)).into_response(),
        Err(e) => errors::organization_error(e),
    }
}

pub async fn get_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &VIEW_SETTINGS, &method, class) {
        return resp;
    }
    match services.organizations.get(ctx.org_id()) {
        Ok(org) => Json(org).into_response(),
        Err(e) => errors::organization_error(e),
    }
}

pub async fn update_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &UPDATE_SETTINGS, &method, class) {
        return resp;
    }
    let patch: SettingsPatch = match dto::parse_body(&body) {
        Ok(patch) => patch,
        Err(resp) => return resp,
    };
    match services.organizations.update_settings(&ctx, patch) {
        Ok(org) => Json(org).into_response(),
        Err(e) => errors::organization_error(e),
    }
}

pub async fn retire_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &RETIRE, &method, class) {
        return resp;
    }
    match services.organizations.retire(&ctx) {
        Ok(org) => Json(org).into_response(),
        Err(e) => errors::organization_error(e),
    }
}
