//! Postgres backend.
//!
//! The store traits are synchronous, so each call drives its sqlx future on
//! the runtime captured at connect time. Calls go through
//! `tokio::task::block_in_place`, which means a Postgres-backed service must
//! run on a multi-threaded runtime or a blocking thread.
//!
//! Concurrency rests on the schema: `(org_id, user_id)` is the membership
//! primary key, `(org_id, email)` is unique per invite, and the read-check-write
//! paths take row locks (`claim_invite`, `count_active_admins`).

use std::cell::RefCell;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::runtime::Handle;
use tracing::{info, warn};

use orggate_auth::{Invite, InviteStatus, Membership, Role, User, UserStatus, normalize_email};
use orggate_core::{InviteId, OrgId, Organization, OrganizationStatus, UserId};

use super::StoreError;
use crate::store::{
    InviteStore, MembershipStore, NewUser, OrganizationStore, RefreshRecord, RefreshTokenLedger,
    StoreTx, UserDirectory,
};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                StoreError::Decode(format!("column {index}: {source}"))
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Drive `fut` to completion from synchronous code.
pub(crate) fn block_on<F: Future>(handle: &Handle, fut: F) -> F::Output {
    tokio::task::block_in_place(|| handle.block_on(fut))
}

#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
    handle: Handle,
}

impl PgDatabase {
    /// Connect, apply the schema, and remember the current runtime.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!(max_connections, "postgres schema ready");
        Ok(Self {
            pool,
            handle: Handle::current(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Run `f` inside one SQL transaction: commit on `Ok`, roll back on `Err`.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        tokio::task::block_in_place(|| {
            let mut tx = self.begin()?;
            let out = f(&mut tx);
            let conn = tx.conn.into_inner();
            match out {
                Ok(value) => {
                    self.handle.block_on(conn.commit()).map_err(StoreError::from)?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback) = self.handle.block_on(conn.rollback()) {
                        warn!(error = %rollback, "transaction rollback failed");
                    }
                    Err(err)
                }
            }
        })
    }

    /// Run a read-only closure; the transaction is always rolled back.
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        tokio::task::block_in_place(|| {
            let tx = self.begin()?;
            let out = f(&tx);
            if let Err(rollback) = self.handle.block_on(tx.conn.into_inner().rollback()) {
                warn!(error = %rollback, "read transaction rollback failed");
            }
            out
        })
    }

    fn begin(&self) -> Result<PgTx, StoreError> {
        let conn = self.handle.block_on(self.pool.begin())?;
        Ok(PgTx {
            conn: RefCell::new(conn),
            handle: self.handle.clone(),
        })
    }
}

/// One open SQL transaction. The store traits are implemented on it.
pub struct PgTx {
    conn: RefCell<Transaction<'static, Postgres>>,
    handle: Handle,
}

impl PgTx {
    fn fetch_optional(&self, query: PgQuery<'_>) -> Result<Option<PgRow>, StoreError> {
        let mut conn = self.conn.borrow_mut();
        Ok(self.handle.block_on(query.fetch_optional(&mut **conn))?)
    }

    fn fetch_all(&self, query: PgQuery<'_>) -> Result<Vec<PgRow>, StoreError> {
        let mut conn = self.conn.borrow_mut();
        Ok(self.handle.block_on(query.fetch_all(&mut **conn))?)
    }

    /// Rows affected.
    fn execute(&self, query: PgQuery<'_>) -> Result<u64, StoreError> {
        let mut conn = self.conn.borrow_mut();
        let done = self.handle.block_on(query.execute(&mut **conn))?;
        Ok(done.rows_affected())
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, status, date_joined";

const ORG_COLUMNS: &str = "id, name, country, base_currency, timezone, status, created_by, created_at";

const INVITE_COLUMNS: &str =
    "id, org_id, email, role, token, status, invited_by, invited_at, accepted_at, accepted_user";

const REFRESH_COLUMNS: &str =
    "digest, user_id, org_id, issued_at, expires_at, last_used_at, use_count, revoked_at";

fn decode_err(what: &str, raw: &str) -> StoreError {
    StoreError::Decode(format!("{what} '{raw}'"))
}

fn user_status_str(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "ACTIVE",
        UserStatus::Inactive => "INACTIVE",
    }
}

fn org_status_str(status: OrganizationStatus) -> &'static str {
    match status {
        OrganizationStatus::Active => "ACTIVE",
        OrganizationStatus::Suspended => "SUSPENDED",
        OrganizationStatus::Deleted => "DELETED",
    }
}

fn invite_status_str(status: InviteStatus) -> &'static str {
    match status {
        InviteStatus::Invited => "INVITED",
        InviteStatus::Active => "ACTIVE",
    }
}

fn org_id(row: &PgRow, column: &str) -> Result<OrgId, StoreError> {
    let raw: String = row.try_get(column)?;
    OrgId::from_str(&raw).map_err(|_| decode_err("organization id", &raw))
}

fn role(row: &PgRow) -> Result<Role, StoreError> {
    let raw: String = row.try_get("role")?;
    Role::from_str(&raw).map_err(|_| decode_err("role", &raw))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        status: match status.as_str() {
            "ACTIVE" => UserStatus::Active,
            "INACTIVE" => UserStatus::Inactive,
            _ => return Err(decode_err("user status", &status)),
        },
        date_joined: row.try_get("date_joined")?,
    })
}

fn organization_from_row(row: &PgRow) -> Result<Organization, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Organization {
        id: org_id(row, "id")?,
        name: row.try_get("name")?,
        country: row.try_get("country")?,
        base_currency: row.try_get("base_currency")?,
        timezone: row.try_get("timezone")?,
        status: match status.as_str() {
            "ACTIVE" => OrganizationStatus::Active,
            "SUSPENDED" => OrganizationStatus::Suspended,
            "DELETED" => OrganizationStatus::Deleted,
            _ => return Err(decode_err("organization status", &status)),
        },
        created_by: UserId::from_uuid(row.try_get("created_by")?),
        created_at: row.try_get("created_at")?,
    })
}

fn membership_from_row(row: &PgRow) -> Result<Membership, StoreError> {
    Ok(Membership {
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        org_id: org_id(row, "org_id")?,
        role: role(row)?,
        assigned_at: row.try_get("assigned_at")?,
    })
}

fn invite_from_row(row: &PgRow) -> Result<Invite, StoreError> {
    let status: String = row.try_get("status")?;
    let accepted_user: Option<uuid::Uuid> = row.try_get("accepted_user")?;
    Ok(Invite {
        id: InviteId::from_uuid(row.try_get("id")?),
        org_id: org_id(row, "org_id")?,
        email: row.try_get("email")?,
        role: role(row)?,
        token: row.try_get("token")?,
        status: match status.as_str() {
            "INVITED" => InviteStatus::Invited,
            "ACTIVE" => InviteStatus::Active,
            _ => return Err(decode_err("invite status", &status)),
        },
        invited_by: UserId::from_uuid(row.try_get("invited_by")?),
        invited_at: row.try_get("invited_at")?,
        accepted_at: row.try_get("accepted_at")?,
        accepted_user: accepted_user.map(UserId::from_uuid),
    })
}

fn refresh_from_row(row: &PgRow) -> Result<RefreshRecord, StoreError> {
    let use_count: i32 = row.try_get("use_count")?;
    Ok(RefreshRecord {
        digest: row.try_get("digest")?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        org_id: org_id(row, "org_id")?,
        issued_at: row.try_get("issued_at")?,
        expires_at: row.try_get("expires_at")?,
        last_used_at: row.try_get("last_used_at")?,
        use_count: u32::try_from(use_count).map_err(|_| decode_err("use count", &use_count.to_string()))?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

impl UserDirectory for PgTx {
    fn create_user(&mut self, new: NewUser) -> Result<User, StoreError> {
        if self.find_by_username(&new.username)?.is_some() {
            return Err(StoreError::Conflict("username".to_string()));
        }
        if self.find_by_email(&new.email)?.is_some() {
            return Err(StoreError::Conflict("email".to_string()));
        }
        let user = User {
            id: UserId::new(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            status: UserStatus::Active,
            date_joined: Utc::now(),
        };
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        let insert = sqlx::query(&sql)
        .bind(*user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user_status_str(user.status))
        .bind(user.date_joined);
        // A concurrent registration can still win the race to the index.
        match self.execute(insert) {
            Err(StoreError::Conflict(index)) if index == "users_username_key" => {
                Err(StoreError::Conflict("username".to_string()))
            }
            Err(StoreError::Conflict(index)) if index == "users_email_key" => {
                Err(StoreError::Conflict("email".to_string()))
            }
            Err(other) => Err(other),
            Ok(_) => Ok(user),
        }
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        self.fetch_optional(sqlx::query(&sql).bind(*id.as_uuid()))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        self.fetch_optional(sqlx::query(&sql).bind(normalize_email(email)))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(username) = lower($1)");
        self.fetch_optional(sqlx::query(&sql).bind(username.trim()))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    fn set_password(&mut self, id: UserId, password_hash: String) -> Result<(), StoreError> {
        let updated = self.execute(
            sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
                .bind(*id.as_uuid())
                .bind(password_hash),
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    fn set_active(&mut self, id: UserId, active: bool) -> Result<(), StoreError> {
        let status = if active { UserStatus::Active } else { UserStatus::Inactive };
        let updated = self.execute(
            sqlx::query("UPDATE users SET status = $2 WHERE id = $1")
                .bind(*id.as_uuid())
                .bind(user_status_str(status)),
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}

impl OrganizationStore for PgTx {
    // DO NOTHING keeps the transaction usable for the id retry loop.
    fn insert_organization(&mut self, org: Organization) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO organizations ({ORG_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO NOTHING"
        );
        let inserted = self.execute(
            sqlx::query(&sql)
                .bind(org.id.as_str())
                .bind(&org.name)
                .bind(&org.country)
                .bind(&org.base_currency)
                .bind(&org.timezone)
                .bind(org_status_str(org.status))
                .bind(*org.created_by.as_uuid())
                .bind(org.created_at),
        )?;
        if inserted == 0 {
            return Err(StoreError::Conflict(format!("organization id {}", org.id)));
        }
        Ok(())
    }

    fn organization(&self, id: &OrgId) -> Result<Option<Organization>, StoreError> {
        let sql = format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = $1");
        self.fetch_optional(sqlx::query(&sql).bind(id.as_str()))?
            .as_ref()
            .map(organization_from_row)
            .transpose()
    }

    fn update_organization(&mut self, org: Organization) -> Result<(), StoreError> {
        let updated = self.execute(
            sqlx::query(
                "UPDATE organizations \
                 SET name = $2, country = $3, base_currency = $4, timezone = $5, status = $6 \
                 WHERE id = $1",
            )
            .bind(org.id.as_str())
            .bind(&org.name)
            .bind(&org.country)
            .bind(&org.base_currency)
            .bind(&org.timezone)
            .bind(org_status_str(org.status)),
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("organization {}", org.id)));
        }
        Ok(())
    }
}

impl MembershipStore for PgTx {
    fn assign(&mut self, user: UserId, org: &OrgId, role: Role) -> Result<Membership, StoreError> {
        let row = self
            .fetch_optional(
                sqlx::query(
                    "INSERT INTO memberships (org_id, user_id, role, assigned_at) \
                     VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (org_id, user_id) DO UPDATE SET role = EXCLUDED.role \
                     RETURNING org_id, user_id, role, assigned_at",
                )
                .bind(org.as_str())
                .bind(*user.as_uuid())
                .bind(role.as_str())
                .bind(Utc::now()),
            )?
            .ok_or_else(|| StoreError::Backend("upsert returned no row".to_string()))?;
        membership_from_row(&row)
    }

    fn lookup(&self, user: UserId, org: &OrgId) -> Result<Option<Role>, StoreError> {
        self.fetch_optional(
            sqlx::query("SELECT role FROM memberships WHERE org_id = $1 AND user_id = $2")
                .bind(org.as_str())
                .bind(*user.as_uuid()),
        )?
        .as_ref()
        .map(role)
        .transpose()
    }

    fn membership(&self, user: UserId, org: &OrgId) -> Result<Option<Membership>, StoreError> {
        self.fetch_optional(
            sqlx::query(
                "SELECT org_id, user_id, role, assigned_at FROM memberships \
                 WHERE org_id = $1 AND user_id = $2",
            )
            .bind(org.as_str())
            .bind(*user.as_uuid()),
        )?
        .as_ref()
        .map(membership_from_row)
        .transpose()
    }

    fn list_for_org(&self, org: &OrgId) -> Result<Vec<Membership>, StoreError> {
        self.fetch_all(
            sqlx::query(
                "SELECT org_id, user_id, role, assigned_at FROM memberships \
                 WHERE org_id = $1 ORDER BY user_id",
            )
            .bind(org.as_str()),
        )?
        .iter()
        .map(membership_from_row)
        .collect()
    }

    fn list_for_user(&self, user: UserId) -> Result<Vec<Membership>, StoreError> {
        self.fetch_all(
            sqlx::query(
                "SELECT org_id, user_id, role, assigned_at FROM memberships \
                 WHERE user_id = $1 ORDER BY assigned_at DESC",
            )
            .bind(*user.as_uuid()),
        )?
        .iter()
        .map(membership_from_row)
        .collect()
    }

    // Locks the admin memberships and their users, so two demotions of
    // different admins cannot both see a count of two.
    fn count_active_admins(&self, org: &OrgId) -> Result<usize, StoreError> {
        let rows = self.fetch_all(
            sqlx::query(
                "SELECT m.user_id FROM memberships m JOIN users u ON u.id = m.user_id \
                 WHERE m.org_id = $1 AND m.role = $2 AND u.status = $3 \
                 FOR UPDATE",
            )
            .bind(org.as_str())
            .bind(Role::OrgAdmin.as_str())
            .bind(user_status_str(UserStatus::Active)),
        )?;
        Ok(rows.len())
    }
}

impl InviteStore for PgTx {
    fn insert_invite(&mut self, invite: Invite) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO invites ({INVITE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) ON CONFLICT DO NOTHING"
        );
        let inserted = self.execute(
            sqlx::query(&sql)
                .bind(*invite.id.as_uuid())
                .bind(invite.org_id.as_str())
                .bind(&invite.email)
                .bind(invite.role.as_str())
                .bind(&invite.token)
                .bind(invite_status_str(invite.status))
                .bind(*invite.invited_by.as_uuid())
                .bind(invite.invited_at)
                .bind(invite.accepted_at)
                .bind(invite.accepted_user.map(|u| *u.as_uuid())),
        )?;
        if inserted == 0 {
            return Err(StoreError::Conflict(format!(
                "invite ({}, {})",
                invite.org_id, invite.email
            )));
        }
        Ok(())
    }

    fn invite_by_token(&self, token: &str) -> Result<Option<Invite>, StoreError> {
        let sql = format!("SELECT {INVITE_COLUMNS} FROM invites WHERE token = $1");
        self.fetch_optional(sqlx::query(&sql).bind(token))?
            .as_ref()
            .map(invite_from_row)
            .transpose()
    }

    fn claim_invite(&mut self, token: &str) -> Result<Option<Invite>, StoreError> {
        let sql = format!("SELECT {INVITE_COLUMNS} FROM invites WHERE token = $1 FOR UPDATE");
        self.fetch_optional(sqlx::query(&sql).bind(token))?
            .as_ref()
            .map(invite_from_row)
            .transpose()
    }

    fn update_invite(&mut self, invite: Invite) -> Result<(), StoreError> {
        let updated = self.execute(
            sqlx::query(
                "UPDATE invites \
                 SET role = $2, status = $3, accepted_at = $4, accepted_user = $5 \
                 WHERE id = $1",
            )
            .bind(*invite.id.as_uuid())
            .bind(invite.role.as_str())
            .bind(invite_status_str(invite.status))
            .bind(invite.accepted_at)
            .bind(invite.accepted_user.map(|u| *u.as_uuid())),
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("invite {}", invite.id)));
        }
        Ok(())
    }

    fn list_invites(&self, org: &OrgId) -> Result<Vec<Invite>, StoreError> {
        let sql = format!("SELECT {INVITE_COLUMNS} FROM invites WHERE org_id = $1 ORDER BY invited_at");
        self.fetch_all(sqlx::query(&sql).bind(org.as_str()))?
            .iter()
            .map(invite_from_row)
            .collect()
    }
}

impl RefreshTokenLedger for PgTx {
    fn record_refresh(&mut self, record: RefreshRecord) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO refresh_tokens ({REFRESH_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (digest) DO NOTHING"
        );
        let inserted = self.execute(
            sqlx::query(&sql)
                .bind(&record.digest)
                .bind(*record.user_id.as_uuid())
                .bind(record.org_id.as_str())
                .bind(record.issued_at)
                .bind(record.expires_at)
                .bind(record.last_used_at)
                .bind(i32::try_from(record.use_count).unwrap_or(i32::MAX))
                .bind(record.revoked_at),
        )?;
        if inserted == 0 {
            return Err(StoreError::Conflict("refresh token".to_string()));
        }
        Ok(())
    }

    fn refresh_record(&self, digest: &str) -> Result<Option<RefreshRecord>, StoreError> {
        let sql = format!("SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE digest = $1");
        self.fetch_optional(sqlx::query(&sql).bind(digest))?
            .as_ref()
            .map(refresh_from_row)
            .transpose()
    }

    fn mark_refresh_used(&mut self, digest: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let updated = self.execute(
            sqlx::query(
                "UPDATE refresh_tokens SET use_count = use_count + 1, last_used_at = $2 \
                 WHERE digest = $1",
            )
            .bind(digest)
            .bind(at),
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound("refresh token".to_string()));
        }
        Ok(())
    }

    fn revoke_refresh(&mut self, digest: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let updated = self.execute(
            sqlx::query(
                "UPDATE refresh_tokens SET revoked_at = $2 \
                 WHERE digest = $1 AND revoked_at IS NULL",
            )
            .bind(digest)
            .bind(at),
        )?;
        if updated == 1 {
            return Ok(true);
        }
        match self.refresh_record(digest)? {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound("refresh token".to_string())),
        }
    }

    fn prune_refresh(&mut self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let pruned = self.execute(
            sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1").bind(now),
        )?;
        Ok(usize::try_from(pruned).unwrap_or(usize::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_columns_use_the_wire_spelling() {
        assert_eq!(user_status_str(UserStatus::Inactive), "INACTIVE");
        assert_eq!(org_status_str(OrganizationStatus::Deleted), "DELETED");
        assert_eq!(
            org_status_str(OrganizationStatus::Suspended),
            OrganizationStatus::Suspended.to_string()
        );
        assert_eq!(invite_status_str(InviteStatus::Invited), "INVITED");
    }

    #[test]
    fn schema_declares_the_uniqueness_the_stores_rely_on() {
        assert!(SCHEMA.contains("PRIMARY KEY (org_id, user_id)"));
        assert!(SCHEMA.contains("UNIQUE (org_id, email)"));
        assert!(SCHEMA.contains("users_username_key"));
        assert!(SCHEMA.contains("users_email_key"));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Backend(_)
        ));
    }
}
