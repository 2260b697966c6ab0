use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orggate_core::UserId;

/// Account activation status. Users are never removed, only deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Lower-cased on write; lookups compare normalized values.
    pub email: String,
    /// PHC-formatted Argon2id hash.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub status: UserStatus,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            status: self.status,
        }
    }
}

/// Public projection of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub status: UserStatus,
}

/// Trim and lower-case an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Username seed derived from the local part of an email.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, then surrounding
/// underscores are stripped; an empty result falls back to `"user"`. Callers
/// append a counter on collision.
pub fn username_base(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let replaced: String = local
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let base = replaced.trim_matches('_');
    if base.is_empty() { "user".to_string() } else { base.to_string() }
}
