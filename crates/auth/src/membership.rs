use chrono::{DateTime, Utc};
use serde::Serialize;

use orggate_core::{OrgId, UserId};

use crate::Role;

/// The single-role relationship between one user and one organization.
///
/// At most one exists per (user, organization); assigning again overwrites
/// `role`. Rows are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub user_id: UserId,
    pub org_id: OrgId,
    pub role: Role,
    pub assigned_at: DateTime<Utc>,
}
