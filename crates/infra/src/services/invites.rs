//! Invite issuance and acceptance.
//!
//! Invite state machine: INVITED --accept(token, password)--> ACTIVE.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use orggate_auth::{
    Invite, InviteStatus, InviteSummary, PasswordError, PasswordHasher, Role, TenantContext,
    generate_secure_token, normalize_email, username_base,
};
use orggate_core::{InviteId, OrgId, UserId};

use crate::db::{Database, StoreError};
use crate::notifications::{Notification, NotificationSender};
use crate::store::{InviteStore, MembershipStore, NewUser, OrganizationStore, UserDirectory};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InviteError {
    #[error("{0}")]
    Validation(String),

    #[error("User is already a member of this organization.")]
    AlreadyMember,

    #[error("This email has already been invited to the organization.")]
    DuplicateInvite,

    #[error("Invite token is invalid.")]
    InvalidToken,

    #[error("Invite has already been accepted.")]
    AlreadyAccepted,

    #[error("Organization not found.")]
    OrganizationNotFound,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl From<PasswordError> for InviteError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => InviteError::Validation(err.to_string()),
            PasswordError::Hashing(msg) => InviteError::Internal(msg),
        }
    }
}

/// Invite mail settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteMail {
    pub from: String,
    /// When non-empty, mails carry `<base>/?token=<token>` instead of the raw token.
    pub accept_url_base: String,
}

impl Default for InviteMail {
    fn default() -> Self {
        Self {
            from: "noreply@orggate.local".to_string(),
            accept_url_base: String::new(),
        }
    }
}

impl InviteMail {
    pub fn compose(&self, org_name: &str, email: &str, token: &str) -> Notification {
        let base = self.accept_url_base.trim();
        let body = if base.is_empty() {
            format!("You've been invited to join {org_name}. Use this invite token to accept: {token}")
        } else {
            format!(
                "You've been invited to join {org_name}. Accept your invite here: {}/?token={token}",
                base.trim_end_matches('/')
            )
        };
        Notification {
            from: self.from.clone(),
            subject: format!("You're invited to {org_name}"),
            body,
            recipients: vec![email.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedInvite {
    pub invite_id: InviteId,
    pub org_id: OrgId,
    pub user_id: UserId,
    pub role: Role,
    pub status: InviteStatus,
}

pub struct InviteService {
    db: Arc<Database>,
    notifier: Arc<dyn NotificationSender>,
    hasher: PasswordHasher,
    mail: InviteMail,
}

impl InviteService {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn NotificationSender>,
        hasher: PasswordHasher,
        mail: InviteMail,
    ) -> Self {
        Self {
            db,
            notifier,
            hasher,
            mail,
        }
    }

    /// Issue an invite for `email` into the caller's organization.
    ///
    /// The notification goes out only after the invite row has committed; a
    /// delivery failure is logged and does not undo the invite.
    #[instrument(skip_all, fields(org_id = %ctx.org_id(), role = %role))]
    pub fn invite(&self, ctx: &TenantContext, email: &str, role: Role) -> Result<InviteSummary, InviteError> {
        let email = normalize_email(email);
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(InviteError::Validation("Enter a valid email address.".to_string()));
        }

        let (invite, org_name) = self.db.transaction(|tx| {
            let org = tx
                .organization(ctx.org_id())?
                .ok_or(InviteError::OrganizationNotFound)?;
            let already_member = match tx.find_by_email(&email)? {
                Some(user) => tx.lookup(user.id, ctx.org_id())?.is_some(),
                None => false,
            };
            if already_member {
                return Err(InviteError::AlreadyMember);
            }
            let invite = Invite {
                id: InviteId::new(),
                org_id: org.id.clone(),
                email: email.clone(),
                role,
                token: generate_secure_token(),
                status: InviteStatus::Invited,
                invited_by: ctx.user_id(),
                invited_at: Utc::now(),
                accepted_at: None,
                accepted_user: None,
            };
            match tx.insert_invite(invite.clone()) {
                Ok(()) => Ok((invite, org.name)),
                Err(StoreError::Conflict(_)) => Err(InviteError::DuplicateInvite),
                Err(other) => Err(InviteError::Storage(other)),
            }
        })?;

        info!(invite_id = %invite.id, "invite created");
        let mail = self.mail.compose(&org_name, &invite.email, &invite.token);
        match self.notifier.send(&mail) {
            Ok(receipt) => info!(delivery_id = %receipt.id, "invite notification dispatched"),
            Err(e) => warn!(invite_id = %invite.id, error = %e, "invite notification failed"),
        }
        Ok(invite.summary())
    }

    /// Redeem an invite token.
    ///
    /// The invite row is re-read and locked inside the transaction, so of two
    /// concurrent acceptances exactly one succeeds and the other sees
    /// `AlreadyAccepted`. Invites into a suspended or retired organization
    /// cannot be redeemed.
    #[instrument(skip_all)]
    pub fn accept(&self, token: &str, password: &str) -> Result<AcceptedInvite, InviteError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(InviteError::InvalidToken);
        }
        let known = self.db.read(|tx| tx.invite_by_token(token))?;
        match known.as_ref().map(|i| i.status) {
            None => return Err(InviteError::InvalidToken),
            Some(InviteStatus::Active) => return Err(InviteError::AlreadyAccepted),
            Some(InviteStatus::Invited) => {}
        }
        PasswordHasher::check_policy(password)?;
        let password_hash = self.hasher.hash(password)?;

        let accepted = self.db.transaction(|tx| {
            let mut invite = tx.claim_invite(token)?.ok_or(InviteError::InvalidToken)?;
            if !invite.is_pending() {
                return Err(InviteError::AlreadyAccepted);
            }
            let org_active = tx.organization(&invite.org_id)?.is_some_and(|o| o.is_active());
            if !org_active {
                return Err(InviteError::Validation("Organization is not active.".to_string()));
            }

            let user_id = match tx.find_by_email(&invite.email)? {
                Some(existing) => {
                    tx.set_password(existing.id, password_hash.clone())?;
                    existing.id
                }
                None => {
                    let username = unique_username(&*tx, &username_base(&invite.email))?;
                    tx.create_user(NewUser::new(&username, &invite.email, &password_hash))?
                        .id
                }
            };

            tx.assign(user_id, &invite.org_id, invite.role)?;
            invite.accept(user_id, Utc::now());
            tx.update_invite(invite.clone())?;

            Ok(AcceptedInvite {
                invite_id: invite.id,
                org_id: invite.org_id,
                user_id,
                role: invite.role,
                status: invite.status,
            })
        })?;

        info!(
            invite_id = %accepted.invite_id,
            org_id = %accepted.org_id,
            user_id = %accepted.user_id,
            "invite accepted"
        );
        Ok(accepted)
    }

    pub fn list(&self, ctx: &TenantContext) -> Result<Vec<InviteSummary>, InviteError> {
        let invites = self.db.read(|tx| tx.list_invites(ctx.org_id()))?;
        Ok(invites.iter().map(Invite::summary).collect())
    }
}

/// `base`, then `base1`, `base2`, ... until unused.
fn unique_username(tx: &(impl UserDirectory + ?Sized), base: &str) -> Result<String, StoreError> {
    let mut candidate = base.to_string();
    let mut counter = 1u32;
    while tx.find_by_username(&candidate)?.is_some() {
        candidate = format!("{base}{counter}");
        counter += 1;
    }
    Ok(candidate)
}
