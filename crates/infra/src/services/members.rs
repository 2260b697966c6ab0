//! Member administration inside the caller's organization.
//!
//! Every read-check-write sequence runs in one transaction so the last-admin
//! count cannot change between the check and the write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use orggate_auth::{GateDenial, Role, TenantContext, UserSummary, protect_last_admin};
use orggate_core::{OrgId, UserId};

use crate::db::{Database, StoreError};
use crate::store::StoreTx;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemberError {
    #[error("User is not a member of this organization.")]
    NotAMember,

    #[error(transparent)]
    Denied(#[from] GateDenial),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub user: UserSummary,
    pub role: Role,
    pub assigned_at: DateTime<Utc>,
}

pub struct MemberService {
    db: Arc<Database>,
}

impl MemberService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn list(&self, ctx: &TenantContext) -> Result<Vec<MemberView>, MemberError> {
        let members = self.db.read(|tx| {
            let mut out = Vec::new();
            for m in tx.list_for_org(ctx.org_id())? {
                if let Some(user) = tx.user(m.user_id)? {
                    out.push(MemberView {
                        user: user.summary(),
                        role: m.role,
                        assigned_at: m.assigned_at,
                    });
                }
            }
            Ok::<_, StoreError>(out)
        })?;
        Ok(members)
    }

    /// Change a member's role. Demoting the last active admin is rejected.
    #[instrument(skip_all, fields(org_id = %ctx.org_id(), target = %target, role = %role))]
    pub fn change_role(&self, ctx: &TenantContext, target: UserId, role: Role) -> Result<MemberView, MemberError> {
        let view = self.db.transaction(|tx| {
            let (current, user) = member_in_org(tx, ctx, target)?;
            if current == Role::OrgAdmin && role != Role::OrgAdmin {
                guard_last_admin(tx, ctx.org_id(), current, user.is_active())?;
            }
            let membership = tx.assign(target, ctx.org_id(), role)?;
            Ok::<_, MemberError>(MemberView {
                user: user.summary(),
                role: membership.role,
                assigned_at: membership.assigned_at,
            })
        })?;
        info!("member role changed");
        Ok(view)
    }

    /// Soft-delete a member's account.
    ///
    /// The account is shared by every organization the user belongs to, so
    /// the request is rejected if the user is the last active admin of any
    /// of them, not just the caller's.
    #[instrument(skip_all, fields(org_id = %ctx.org_id(), target = %target))]
    pub fn deactivate(&self, ctx: &TenantContext, target: UserId) -> Result<(), MemberError> {
        self.db.transaction(|tx| {
            let (_, user) = member_in_org(tx, ctx, target)?;
            for membership in tx.list_for_user(target)? {
                if membership.role == Role::OrgAdmin {
                    guard_last_admin(tx, &membership.org_id, membership.role, user.is_active())?;
                }
            }
            tx.set_active(target, false)?;
            Ok::<_, MemberError>(())
        })?;
        info!("member deactivated");
        Ok(())
    }

    #[instrument(skip_all, fields(org_id = %ctx.org_id(), target = %target))]
    pub fn reactivate(&self, ctx: &TenantContext, target: UserId) -> Result<(), MemberError> {
        self.db.transaction(|tx| {
            member_in_org(tx, ctx, target)?;
            tx.set_active(target, true)?;
            Ok::<_, MemberError>(())
        })?;
        info!("member reactivated");
        Ok(())
    }

    /// Self-service deactivation, with the same last-admin protection.
    pub fn deactivate_self(&self, ctx: &TenantContext) -> Result<(), MemberError> {
        self.deactivate(ctx, ctx.user_id())
    }
}

fn member_in_org(
    tx: &dyn StoreTx,
    ctx: &TenantContext,
    target: UserId,
) -> Result<(Role, orggate_auth::User), MemberError> {
    let role = tx.lookup(target, ctx.org_id())?.ok_or(MemberError::NotAMember)?;
    let user = tx.user(target)?.ok_or(MemberError::NotAMember)?;
    Ok((role, user))
}

fn guard_last_admin(
    tx: &dyn StoreTx,
    org_id: &OrgId,
    target_role: Role,
    target_active: bool,
) -> Result<(), MemberError> {
    let admins = tx.count_active_admins(org_id)?;
    protect_last_admin(target_role, target_active, admins).map_err(|denial| {
        warn!(org_id = %org_id, reason = "last_admin", "last active admin protected");
        MemberError::Denied(denial)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Harness;

    #[test]
    fn sole_admin_cannot_be_deactivated_but_second_admin_can() {
        let h = Harness::new();
        let first = h.register("quinn", "quinn@example.com");
        let org = h.create_org(first);
        let admin_ctx = h.ctx(first, &org);

        assert_eq!(
            h.members.deactivate(&admin_ctx, first),
            Err(MemberError::Denied(GateDenial::LastAdmin))
        );
        assert_eq!(h.members.deactivate_self(&admin_ctx), Err(MemberError::Denied(GateDenial::LastAdmin)));

        let second = h.register("rita", "rita@example.com");
        h.db.transaction(|tx| tx.assign(second, &org, Role::OrgAdmin)).unwrap();

        assert_eq!(h.members.deactivate(&admin_ctx, second), Ok(()));
        assert_eq!(h.db.read(|tx| tx.count_active_admins(&org)).unwrap(), 1);
    }

    #[test]
    fn deactivation_is_denied_when_target_is_sole_admin_elsewhere() {
        let h = Harness::new();
        let alice = h.register("alice", "alice@example.com");
        let org_a = h.create_org(alice);
        let bob = h.register("bob", "bob@example.com");
        let org_b = h.create_org(bob);
        h.db.transaction(|tx| tx.assign(bob, &org_a, Role::Viewer)).unwrap();

        assert_eq!(
            h.members.deactivate(&h.ctx(alice, &org_a), bob),
            Err(MemberError::Denied(GateDenial::LastAdmin))
        );
        assert!(h.db.read(|tx| tx.user(bob)).unwrap().unwrap().is_active());
        assert_eq!(h.db.read(|tx| tx.count_active_admins(&org_b)).unwrap(), 1);

        let carol = h.register("carol", "carol@example.com");
        h.db.transaction(|tx| tx.assign(carol, &org_b, Role::OrgAdmin)).unwrap();
        assert_eq!(h.members.deactivate(&h.ctx(alice, &org_a), bob), Ok(()));
        assert_eq!(h.db.read(|tx| tx.count_active_admins(&org_b)).unwrap(), 1);
    }

    #[test]
    fn non_admin_can_be_deactivated_and_reactivated() {
        let h = Harness::new();
        let admin = h.register("sam", "sam@example.com");
        let org = h.create_org(admin);
        let clerk = h.register("tess", "tess@example.com");
        h.db.transaction(|tx| tx.assign(clerk, &org, Role::Finance)).unwrap();
        let ctx = h.ctx(admin, &org);

        h.members.deactivate(&ctx, clerk).unwrap();
        assert!(!h.db.read(|tx| tx.user(clerk)).unwrap().unwrap().is_active());

        h.members.reactivate(&ctx, clerk).unwrap();
        assert!(h.db.read(|tx| tx.user(clerk)).unwrap().unwrap().is_active());
    }

    #[test]
    fn last_admin_cannot_be_demoted() {
        let h = Harness::new();
        let admin = h.register("uma", "uma@example.com");
        let org = h.create_org(admin);
        let ctx = h.ctx(admin, &org);

        assert_eq!(
            h.members.change_role(&ctx, admin, Role::Viewer).unwrap_err(),
            MemberError::Denied(GateDenial::LastAdmin)
        );
        assert_eq!(h.members.change_role(&ctx, admin, Role::OrgAdmin).unwrap().role, Role::OrgAdmin);
    }

    #[test]
    fn targets_outside_the_org_are_not_members() {
        let h = Harness::new();
        let admin = h.register("vic", "vic@example.com");
        let org = h.create_org(admin);
        let stranger = h.register("wes", "wes@example.com");

        assert_eq!(
            h.members.deactivate(&h.ctx(admin, &org), stranger),
            Err(MemberError::NotAMember)
        );
        assert_eq!(h.members.list(&h.ctx(admin, &org)).unwrap().len(), 1);
    }
}
