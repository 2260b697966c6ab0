use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::debug;

use orggate_auth::generate_secure_token;
use orggate_core::{OrgId, UserId};

use crate::db::{PgDatabase, StoreError, block_on};

/// Server-side session established at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: UserId,
    /// Organization bound at login, if any.
    pub org_id: Option<OrgId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn start(user_id: UserId, org_id: Option<OrgId>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            id: generate_secure_token(),
            user_id,
            org_id,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Expired sessions are never returned by `get`.
pub trait SessionStore: Send + Sync {
    fn create(&self, user_id: UserId, org_id: Option<OrgId>) -> Result<Session, StoreError>;
    fn get(&self, id: &str) -> Result<Option<Session>, StoreError>;
    fn destroy(&self, id: &str) -> Result<bool, StoreError>;
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn create(&self, user_id: UserId, org_id: Option<OrgId>) -> Result<Session, StoreError> {
        (**self).create(user_id, org_id)
    }

    fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        (**self).get(id)
    }

    fn destroy(&self, id: &str) -> Result<bool, StoreError> {
        (**self).destroy(id)
    }
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

impl SessionStore for InMemorySessionStore {
    /// Expired sessions are pruned on every write.
    fn create(&self, user_id: UserId, org_id: Option<OrgId>) -> Result<Session, StoreError> {
        let session = Session::start(user_id, org_id, self.ttl);
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let now = session.created_at;
        map.retain(|_, s| s.is_live(now));
        map.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let now = Utc::now();
        Ok(map.get(id).filter(|s| s.is_live(now)).cloned())
    }

    fn destroy(&self, id: &str) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(id).is_some())
    }
}

/// Sessions in the `sessions` table, sharing the database pool.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
    handle: Handle,
    ttl: Duration,
}

impl PostgresSessionStore {
    pub fn new(db: &PgDatabase, ttl: Duration) -> Self {
        Self {
            pool: db.pool().clone(),
            handle: db.handle().clone(),
            ttl,
        }
    }
}

impl SessionStore for PostgresSessionStore {
    fn create(&self, user_id: UserId, org_id: Option<OrgId>) -> Result<Session, StoreError> {
        let session = Session::start(user_id, org_id, self.ttl);
        block_on(&self.handle, async {
            let pruned = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
                .bind(session.created_at)
                .execute(&self.pool)
                .await?
                .rows_affected();
            if pruned > 0 {
                debug!(pruned, "expired sessions pruned");
            }
            sqlx::query(
                "INSERT INTO sessions (id, user_id, org_id, created_at, expires_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&session.id)
            .bind(*session.user_id.as_uuid())
            .bind(session.org_id.as_ref().map(|o| o.as_str()))
            .bind(session.created_at)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })?;
        Ok(session)
    }

    fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let row = block_on(
            &self.handle,
            sqlx::query(
                "SELECT id, user_id, org_id, created_at, expires_at FROM sessions \
                 WHERE id = $1 AND expires_at > $2",
            )
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(&self.pool),
        )?;
        let Some(row) = row else {
            return Ok(None);
        };
        let org_id: Option<String> = row.try_get("org_id")?;
        let org_id = org_id
            .map(|raw| OrgId::from_str(&raw).map_err(|_| StoreError::Decode(format!("organization id '{raw}'"))))
            .transpose()?;
        Ok(Some(Session {
            id: row.try_get("id")?,
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            org_id,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        }))
    }

    fn destroy(&self, id: &str) -> Result<bool, StoreError> {
        let done = block_on(
            &self.handle,
            sqlx::query("DELETE FROM sessions WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_can_be_destroyed_once() {
        let store = InMemorySessionStore::new(Duration::hours(1));
        let org = OrgId::generate();
        let session = store.create(UserId::new(), Some(org.clone())).unwrap();

        assert_eq!(store.get(&session.id).unwrap().and_then(|s| s.org_id), Some(org));
        assert!(store.destroy(&session.id).unwrap());
        assert!(!store.destroy(&session.id).unwrap());
        assert!(store.get(&session.id).unwrap().is_none());
    }

    #[test]
    fn expired_sessions_are_hidden_and_pruned_on_write() {
        let store = InMemorySessionStore::new(Duration::zero());
        let stale = store.create(UserId::new(), None).unwrap();

        assert!(store.get(&stale.id).unwrap().is_none());

        store.create(UserId::new(), None).unwrap();
        let map = store.inner.read().unwrap();
        assert!(!map.contains_key(&stale.id));
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let store = Arc::new(InMemorySessionStore::new(Duration::hours(1)));
        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the session map");
        })
        .join();

        assert_eq!(store.create(UserId::new(), None), Err(StoreError::Poisoned));
        assert_eq!(store.get("anything"), Err(StoreError::Poisoned));
    }
}
