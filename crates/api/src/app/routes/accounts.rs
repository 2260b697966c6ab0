use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::IntoResponse,
    routing::post,
};

use orggate_auth::{PathClass, RoleRequirement, TenantContext};
use orggate_infra::services::Registration;

use crate::app::{blocking, dto, errors, services::AppServices};
use crate::authz;
use crate::context::extract_credentials;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me/deactivate", post(deactivate_self))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let role = match body.role.as_deref().map(dto::parse_role).transpose() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let org_id = match body.org_id.as_deref().map(dto::parse_org_id).transpose() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let registration = Registration {
        username: body.username,
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
        role,
        org_id,
    };

    let accounts = services.accounts.clone();
    match blocking(move || accounts.register(registration)).await {
        Ok(Ok(summary)) => (StatusCode::CREATED, Json(summary)).into_response(),
        Ok(Err(e)) => errors::account_error(e),
        Err(resp) => resp,
    }
}

/// Issues the token pair and binds a server-side session to the resolved
/// organization via cookie.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let Some(login_name) = body.login_name().map(str::to_string) else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "username or email is required.",
        );
    };
    let org_id = match body.org_id.as_deref().map(dto::parse_org_id).transpose() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let accounts = services.accounts.clone();
    let password = body.password;
    let outcome = match blocking(move || accounts.login(&login_name, &password, org_id.as_ref())).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return errors::account_error(e),
        Err(resp) => return resp,
    };

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        services.config.session_cookie, outcome.session_id
    );
    let mut response = Json(&outcome).into_response();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Err(e) => return errors::internal(e),
    }
    response
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RefreshTokenRequest>,
) -> axum::response::Response {
    let token = body.refresh_token.unwrap_or_default();
    match services.accounts.refresh(&token) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::account_error(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<dto::RefreshTokenRequest>,
) -> axum::response::Response {
    let session_id = extract_credentials(&headers, &services.config)
        .ok()
        .and_then(|c| c.session_id);
    match services
        .accounts
        .logout(body.refresh_token.as_deref(), session_id.as_deref())
    {
        Ok(()) => Json(dto::DetailResponse {
            detail: "Logout successful.",
        })
        .into_response(),
        Err(e) => errors::account_error(e),
    }
}

const DEACTIVATE_SELF: RoleRequirement = RoleRequirement::any_role("deactivate their account");

pub async fn deactivate_self(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &DEACTIVATE_SELF, &method, class) {
        return resp;
    }
    match services.members.deactivate_self(&ctx) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::member_error(e),
    }
}
