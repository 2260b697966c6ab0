use orggate_auth::Invite;
use orggate_core::OrgId;

use crate::db::{StoreError, Tx};

pub trait InviteStore {
    /// `Conflict` when the organization already has an invite for the email.
    fn insert_invite(&mut self, invite: Invite) -> Result<(), StoreError>;

    fn invite_by_token(&self, token: &str) -> Result<Option<Invite>, StoreError>;

    /// Like [`InviteStore::invite_by_token`], but the row stays locked until
    /// the transaction ends so concurrent acceptances queue behind each other.
    fn claim_invite(&mut self, token: &str) -> Result<Option<Invite>, StoreError>;

    fn update_invite(&mut self, invite: Invite) -> Result<(), StoreError>;

    /// Oldest first.
    fn list_invites(&self, org: &OrgId) -> Result<Vec<Invite>, StoreError>;
}

impl InviteStore for Tx<'_> {
    fn insert_invite(&mut self, invite: Invite) -> Result<(), StoreError> {
        let taken = self
            .tables
            .invites
            .values()
            .any(|i| i.org_id == invite.org_id && i.email == invite.email);
        if taken {
            return Err(StoreError::Conflict(format!(
                "invite ({}, {})",
                invite.org_id, invite.email
            )));
        }
        if self.tables.invites.values().any(|i| i.token == invite.token) {
            return Err(StoreError::Conflict("invite token".to_string()));
        }
        self.tables.invites.insert(invite.id, invite);
        Ok(())
    }

    fn invite_by_token(&self, token: &str) -> Result<Option<Invite>, StoreError> {
        Ok(self
            .tables
            .invites
            .values()
            .find(|i| i.token == token)
            .cloned())
    }

    // The whole in-memory transaction already holds the table lock.
    fn claim_invite(&mut self, token: &str) -> Result<Option<Invite>, StoreError> {
        self.invite_by_token(token)
    }

    fn update_invite(&mut self, invite: Invite) -> Result<(), StoreError> {
        match self.tables.invites.get_mut(&invite.id) {
            Some(slot) => {
                *slot = invite;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("invite {}", invite.id))),
        }
    }

    fn list_invites(&self, org: &OrgId) -> Result<Vec<Invite>, StoreError> {
        let mut out: Vec<Invite> = self
            .tables
            .invites
            .values()
            .filter(|i| &i.org_id == org)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.invited_at.cmp(&b.invited_at));
        Ok(out)
    }
}
