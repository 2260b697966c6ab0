//! Role Gate: allow/deny decisions over a resolved [`TenantContext`].
//!
//! - No IO
//! - No panics
//! - Exhaustive matches on [`Role`]; no string comparisons

use serde::Serialize;
use thiserror::Error;

use crate::{Role, TenantContext};

/// Whether a request only reads or may mutate state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Read,
    Mutate,
}

impl Access {
    /// `GET`, `HEAD` and `OPTIONS` are reads; every other method mutates.
    pub fn from_method(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" | "OPTIONS" => Access::Read,
            _ => Access::Mutate,
        }
    }
}

/// Classification of the target path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PathClass {
    Internal,
    Vendor,
    General,
}

/// Per-endpoint role declaration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RoleRequirement {
    /// Human-readable action used in denial messages, e.g. `"approve invoices"`.
    pub action: &'static str,
    pub allowed: &'static [Role],
}

impl RoleRequirement {
    pub const fn new(action: &'static str, allowed: &'static [Role]) -> Self {
        Self { action, allowed }
    }

    pub const fn any_role(action: &'static str) -> Self {
        Self::new(action, &Role::ALL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    ViewerReadOnly,
    VendorInternal,
    RoleNotAllowed,
    LastAdmin,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateDenial {
    #[error("Viewer role cannot mutate data.")]
    ViewerReadOnly,

    #[error("Vendor role cannot access internal endpoints.")]
    VendorInternal,

    #[error("Role {role} is not allowed to {action}.")]
    RoleNotAllowed { role: Role, action: String },

    #[error("Organization must keep at least one active admin.")]
    LastAdmin,
}

impl GateDenial {
    pub fn kind(&self) -> DenialKind {
        match self {
            GateDenial::ViewerReadOnly => DenialKind::ViewerReadOnly,
            GateDenial::VendorInternal => DenialKind::VendorInternal,
            GateDenial::RoleNotAllowed { .. } => DenialKind::RoleNotAllowed,
            GateDenial::LastAdmin => DenialKind::LastAdmin,
        }
    }
}

/// Decide whether `ctx` may perform the operation described by `requirement`.
///
/// The universal rules run before the per-endpoint list: a viewer never
/// mutates and a vendor never reaches an internal path, whatever the list says.
pub fn check(
    ctx: &TenantContext,
    requirement: &RoleRequirement,
    access: Access,
    class: PathClass,
) -> Result<(), GateDenial> {
    check_role(ctx.role(), requirement.allowed, requirement.action, access, class)
}

/// Same decision as [`check`] for a bare role and an arbitrary allowed set.
pub fn check_role(
    role: Role,
    allowed: &[Role],
    action: &str,
    access: Access,
    class: PathClass,
) -> Result<(), GateDenial> {
    match (role, access) {
        (Role::Viewer, Access::Mutate) => return Err(GateDenial::ViewerReadOnly),
        (Role::Viewer, Access::Read)
        | (Role::OrgAdmin | Role::Finance | Role::Approver | Role::Vendor, _) => {}
    }

    match (role, class) {
        (Role::Vendor, PathClass::Internal) => return Err(GateDenial::VendorInternal),
        (Role::Vendor, PathClass::Vendor | PathClass::General)
        | (Role::OrgAdmin | Role::Finance | Role::Approver | Role::Viewer, _) => {}
    }

    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(GateDenial::RoleNotAllowed {
            role,
            action: action.to_string(),
        })
    }
}

/// Last-admin protection for deactivation or demotion of `target`.
///
/// `active_admins` is the organization's current count of active ORG_ADMIN
/// memberships, the target included.
pub fn protect_last_admin(
    target_role: Role,
    target_active: bool,
    active_admins: usize,
) -> Result<(), GateDenial> {
    match target_role {
        Role::OrgAdmin if target_active && active_admins <= 1 => Err(GateDenial::LastAdmin),
        Role::OrgAdmin | Role::Finance | Role::Approver | Role::Viewer | Role::Vendor => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orggate_core::{OrgId, UserId};
    use proptest::prelude::*;

    use crate::ContextSource;

    fn ctx(role: Role) -> TenantContext {
        TenantContext::new(UserId::new(), OrgId::generate(), role, ContextSource::Token)
    }

    const APPROVE: RoleRequirement = RoleRequirement::new("approve invoices", &[Role::Approver]);
    const LIST: RoleRequirement = RoleRequirement::new(
        "list invoices",
        &[Role::OrgAdmin, Role::Finance, Role::Approver, Role::Viewer],
    );

    #[test]
    fn safe_methods_are_reads() {
        for m in ["GET", "head", "Options"] {
            assert_eq!(Access::from_method(m), Access::Read);
        }
        for m in ["POST", "PUT", "PATCH", "DELETE"] {
            assert_eq!(Access::from_method(m), Access::Mutate);
        }
    }

    #[test]
    fn viewer_reads_listed_endpoint() {
        assert_eq!(check(&ctx(Role::Viewer), &LIST, Access::Read, PathClass::Internal), Ok(()));
    }

    #[test]
    fn viewer_cannot_mutate_even_when_listed() {
        let req = RoleRequirement::any_role("update anything");
        assert_eq!(
            check(&ctx(Role::Viewer), &req, Access::Mutate, PathClass::General),
            Err(GateDenial::ViewerReadOnly)
        );
    }

    #[test]
    fn vendor_is_confined_to_vendor_paths() {
        let req = RoleRequirement::any_role("do anything");
        assert_eq!(
            check(&ctx(Role::Vendor), &req, Access::Read, PathClass::Internal),
            Err(GateDenial::VendorInternal)
        );
        assert_eq!(check(&ctx(Role::Vendor), &req, Access::Mutate, PathClass::Vendor), Ok(()));
    }

    #[test]
    fn denial_names_role_and_action() {
        let err = check(&ctx(Role::Finance), &APPROVE, Access::Mutate, PathClass::Internal).unwrap_err();
        assert_eq!(err.kind(), DenialKind::RoleNotAllowed);
        assert_eq!(err.to_string(), "Role FINANCE is not allowed to approve invoices.");
    }

    #[test]
    fn last_admin_rules() {
        assert_eq!(protect_last_admin(Role::OrgAdmin, true, 1), Err(GateDenial::LastAdmin));
        assert_eq!(protect_last_admin(Role::OrgAdmin, true, 2), Ok(()));
        assert_eq!(protect_last_admin(Role::OrgAdmin, false, 1), Ok(()));
        assert_eq!(protect_last_admin(Role::Finance, true, 1), Ok(()));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn any_class() -> impl Strategy<Value = PathClass> {
        prop::sample::select(vec![PathClass::Internal, PathClass::Vendor, PathClass::General])
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a viewer is denied every mutating method on every path,
        /// whatever the allowed set contains.
        #[test]
        fn viewer_never_mutates(
            allowed in prop::collection::vec(any_role(), 0..6),
            method in prop::sample::select(vec!["POST", "PUT", "PATCH", "DELETE", "TRACE"]),
            class in any_class(),
        ) {
            let result = check_role(Role::Viewer, &allowed, "act", Access::from_method(method), class);
            prop_assert_eq!(result, Err(GateDenial::ViewerReadOnly));
        }

        /// Property: a vendor never reaches an internal path.
        #[test]
        fn vendor_never_internal(
            allowed in prop::collection::vec(any_role(), 0..6),
            method in prop::sample::select(vec!["GET", "POST", "DELETE"]),
        ) {
            let result = check_role(Role::Vendor, &allowed, "act", Access::from_method(method), PathClass::Internal);
            prop_assert_eq!(result, Err(GateDenial::VendorInternal));
        }

        /// Property: outside the universal rules, the decision is set membership.
        #[test]
        fn non_universal_decisions_follow_the_allowed_set(
            role in prop::sample::select(vec![Role::OrgAdmin, Role::Finance, Role::Approver]),
            allowed in prop::collection::vec(any_role(), 0..6),
            class in any_class(),
        ) {
            let result = check_role(role, &allowed, "act", Access::Mutate, class);
            prop_assert_eq!(result.is_ok(), allowed.contains(&role));
        }
    }
}
