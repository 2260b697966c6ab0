use chrono::{DateTime, Utc};

use orggate_core::{OrgId, UserId};

use crate::db::{StoreError, Tx};

/// Ledger entry for one issued refresh token.
///
/// Lifecycle: issued, then any number of refreshes (`use_count`,
/// `last_used_at`), then revoked. Expiry bounds the whole lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    pub digest: String,
    pub user_id: UserId,
    pub org_id: OrgId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub use_count: u32,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshRecord {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

pub trait RefreshTokenLedger {
    fn record_refresh(&mut self, record: RefreshRecord) -> Result<(), StoreError>;

    fn refresh_record(&self, digest: &str) -> Result<Option<RefreshRecord>, StoreError>;

    fn mark_refresh_used(&mut self, digest: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Returns `false` when the record was already revoked.
    fn revoke_refresh(&mut self, digest: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Drop records whose expiry is at or before `now`; returns how many.
    fn prune_refresh(&mut self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

impl RefreshTokenLedger for Tx<'_> {
    fn record_refresh(&mut self, record: RefreshRecord) -> Result<(), StoreError> {
        if self.tables.refresh_tokens.contains_key(&record.digest) {
            return Err(StoreError::Conflict("refresh token".to_string()));
        }
        self.tables
            .refresh_tokens
            .insert(record.digest.clone(), record);
        Ok(())
    }

    fn refresh_record(&self, digest: &str) -> Result<Option<RefreshRecord>, StoreError> {
        Ok(self.tables.refresh_tokens.get(digest).cloned())
    }

    fn mark_refresh_used(&mut self, digest: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let record = self
            .tables
            .refresh_tokens
            .get_mut(digest)
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))?;
        record.use_count = record.use_count.saturating_add(1);
        record.last_used_at = Some(at);
        Ok(())
    }

    fn revoke_refresh(&mut self, digest: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let record = self
            .tables
            .refresh_tokens
            .get_mut(digest)
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))?;
        if record.revoked_at.is_some() {
            return Ok(false);
        }
        record.revoked_at = Some(at);
        Ok(true)
    }

    fn prune_refresh(&mut self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.tables.refresh_tokens.len();
        self.tables.refresh_tokens.retain(|_, r| r.expires_at > now);
        Ok(before - self.tables.refresh_tokens.len())
    }
}
