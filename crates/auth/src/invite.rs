use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orggate_core::{InviteId, OrgId, UserId};

use crate::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    Invited,
    Active,
}

/// An offer of membership redeemable once via its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invite {
    pub id: InviteId,
    pub org_id: OrgId,
    /// Normalized; unique per organization.
    pub email: String,
    pub role: Role,
    pub token: String,
    pub status: InviteStatus,
    pub invited_by: UserId,
    pub invited_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_user: Option<UserId>,
}

impl Invite {
    pub fn is_pending(&self) -> bool {
        self.status == InviteStatus::Invited
    }

    /// INVITED -> ACTIVE. Returns `false` when already accepted.
    pub fn accept(&mut self, user: UserId, at: DateTime<Utc>) -> bool {
        match self.status {
            InviteStatus::Active => false,
            InviteStatus::Invited => {
                self.status = InviteStatus::Active;
                self.accepted_at = Some(at);
                self.accepted_user = Some(user);
                true
            }
        }
    }

    pub fn summary(&self) -> InviteSummary {
        InviteSummary {
            id: self.id,
            org_id: self.org_id.clone(),
            email: self.email.clone(),
            role: self.role,
            status: self.status,
            invited_at: self.invited_at,
            accepted_at: self.accepted_at,
        }
    }
}

/// Listing projection; the token is only ever disclosed to the invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteSummary {
    pub id: InviteId,
    pub org_id: OrgId,
    pub email: String,
    pub role: Role,
    pub status: InviteStatus,
    pub invited_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_is_one_shot() {
        let mut invite = Invite {
            id: InviteId::new(),
            org_id: OrgId::generate(),
            email: "a@example.com".to_string(),
            role: Role::Finance,
            token: "t".to_string(),
            status: InviteStatus::Invited,
            invited_by: UserId::new(),
            invited_at: Utc::now(),
            accepted_at: None,
            accepted_user: None,
        };
        let user = UserId::new();

        assert!(invite.accept(user, Utc::now()));
        assert_eq!(invite.status, InviteStatus::Active);
        assert_eq!(invite.accepted_user, Some(user));
        assert!(!invite.accept(UserId::new(), Utc::now()));
        assert_eq!(invite.accepted_user, Some(user));
    }
}
