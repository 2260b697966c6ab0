//! Handler-side role gate.
//!
//! Runs after the middleware has bound the tenant context and before the
//! handler performs any effect.

use axum::http::Method;
use axum::response::Response;
use tracing::warn;

use orggate_auth::{Access, PathClass, RoleRequirement, TenantContext, gate};

use crate::app::errors;

pub fn require(
    ctx: &TenantContext,
    requirement: &RoleRequirement,
    method: &Method,
    class: PathClass,
) -> Result<(), Response> {
    gate::check(ctx, requirement, Access::from_method(method.as_str()), class).map_err(|denial| {
        warn!(
            user_id = %ctx.user_id(),
            org_id = %ctx.org_id(),
            role = %ctx.role(),
            action = requirement.action,
            reason = ?denial.kind(),
            "role gate denied request"
        );
        errors::denial(denial)
    })
}
