use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use orggate_auth::{DenialKind, GateDenial};
use orggate_infra::services::{AccountError, InviteError, MemberError, OrganizationError};
use orggate_infra::{ContextError, LoginError, UnauthenticatedReason};

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

/// Generic 500. The detail goes to the log, never to the caller.
pub fn internal(detail: impl std::fmt::Display) -> axum::response::Response {
    error!(error = %detail, "unexpected failure while handling request");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "An unexpected error occurred.",
    )
}

pub fn unauthenticated(reason: UnauthenticatedReason) -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, reason.as_str(), reason.message())
}

pub fn context_error(err: ContextError) -> axum::response::Response {
    match err {
        ContextError::Unauthenticated(reason) => unauthenticated(reason),
        ContextError::InvalidOrgContext | ContextError::RoleMismatch => {
            json_error(StatusCode::UNAUTHORIZED, err.reason(), err.to_string())
        }
        ContextError::OrgContextRequired | ContextError::NoOrgContext | ContextError::OrganizationInactive => {
            json_error(StatusCode::FORBIDDEN, err.reason(), err.to_string())
        }
        ContextError::Storage(e) => internal(e),
    }
}

pub fn denial(denial: GateDenial) -> axum::response::Response {
    let code = match denial.kind() {
        DenialKind::ViewerReadOnly => "viewer_read_only",
        DenialKind::VendorInternal => "vendor_internal",
        DenialKind::RoleNotAllowed => "role_not_allowed",
        DenialKind::LastAdmin => "last_admin",
    };
    json_error(StatusCode::FORBIDDEN, code, denial.to_string())
}

pub fn login_error(err: LoginError) -> axum::response::Response {
    match err {
        LoginError::OrganizationNotFound => {
            json_error(StatusCode::BAD_REQUEST, "organization_not_found", err.to_string())
        }
        LoginError::OrganizationInactive => {
            json_error(StatusCode::FORBIDDEN, "organization_inactive", err.to_string())
        }
        LoginError::NotAMember => json_error(StatusCode::FORBIDDEN, "not_a_member", err.to_string()),
        LoginError::NoMemberships => json_error(StatusCode::FORBIDDEN, "no_memberships", err.to_string()),
        LoginError::AmbiguousOrganization { .. } => {
            json_error(StatusCode::CONFLICT, "ambiguous_organization", err.to_string())
        }
        LoginError::Storage(e) => internal(e),
    }
}

pub fn account_error(err: AccountError) -> axum::response::Response {
    match err {
        AccountError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AccountError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        AccountError::OrganizationNotFound => {
            json_error(StatusCode::BAD_REQUEST, "organization_not_found", err.to_string())
        }
        AccountError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
        }
        AccountError::UserInactive => json_error(StatusCode::FORBIDDEN, "user_inactive", err.to_string()),
        AccountError::Login(e) => login_error(e),
        AccountError::RefreshTokenRequired => {
            json_error(StatusCode::BAD_REQUEST, "refresh_token_required", err.to_string())
        }
        AccountError::InvalidRefreshToken => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_refresh_token", err.to_string())
        }
        AccountError::LogoutRejected => {
            json_error(StatusCode::BAD_REQUEST, "invalid_refresh_token", err.to_string())
        }
        AccountError::Internal(msg) => internal(msg),
        AccountError::Storage(e) => internal(e),
    }
}

pub fn organization_error(err: OrganizationError) -> axum::response::Response {
    match err {
        OrganizationError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        OrganizationError::EmptyPatch => json_error(StatusCode::BAD_REQUEST, "empty_patch", err.to_string()),
        OrganizationError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        OrganizationError::InvalidCreator => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_creator", err.to_string())
        }
        OrganizationError::Storage(e) => internal(e),
    }
}

pub fn invite_error(err: InviteError) -> axum::response::Response {
    match err {
        InviteError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        InviteError::AlreadyMember => json_error(StatusCode::BAD_REQUEST, "already_member", err.to_string()),
        InviteError::DuplicateInvite => {
            json_error(StatusCode::BAD_REQUEST, "duplicate_invite", err.to_string())
        }
        InviteError::InvalidToken => json_error(StatusCode::BAD_REQUEST, "invalid_token", err.to_string()),
        InviteError::AlreadyAccepted => {
            json_error(StatusCode::BAD_REQUEST, "already_accepted", err.to_string())
        }
        InviteError::OrganizationNotFound => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        InviteError::Internal(msg) => internal(msg),
        InviteError::Storage(e) => internal(e),
    }
}

pub fn member_error(err: MemberError) -> axum::response::Response {
    match err {
        MemberError::NotAMember => json_error(StatusCode::NOT_FOUND, "not_a_member", err.to_string()),
        MemberError::Denied(d) => denial(d),
        MemberError::Storage(e) => internal(e),
    }
}
