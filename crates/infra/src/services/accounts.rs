//! Registration, login, token refresh and logout.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use orggate_auth::{
    PasswordError, PasswordHasher, Role, TokenError, User, UserSummary, generate_secure_token,
    token_digest,
};
use orggate_core::{OrgId, UserId};

use crate::db::{Database, StoreError};
use crate::resolver::{ContextResolver, LoginError};
use crate::sessions::SessionStore;
use crate::store::{
    MembershipStore, NewUser, OrganizationStore, RefreshRecord, RefreshTokenLedger, UserDirectory,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    /// Duplicate username or email.
    #[error("{0}")]
    Conflict(String),

    #[error("Organization not found.")]
    OrganizationNotFound,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("User is inactive.")]
    UserInactive,

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error("refresh token is required.")]
    RefreshTokenRequired,

    /// Unknown, expired or revoked token presented to refresh.
    #[error("Invalid or expired refresh token.")]
    InvalidRefreshToken,

    /// Unknown, expired or revoked token presented to logout.
    #[error("Invalid or expired refresh token.")]
    LogoutRejected,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl From<PasswordError> for AccountError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => AccountError::Validation(err.to_string()),
            PasswordError::Hashing(msg) => AccountError::Internal(msg),
        }
    }
}

impl From<TokenError> for AccountError {
    fn from(err: TokenError) -> Self {
        AccountError::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<Role>,
    pub org_id: Option<OrgId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: UserId,
    pub org_id: OrgId,
    pub role: Role,
    #[serde(skip)]
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub org_id: OrgId,
    pub role: Role,
}

pub struct AccountService {
    db: Arc<Database>,
    sessions: Arc<dyn SessionStore>,
    resolver: ContextResolver,
    hasher: PasswordHasher,
    refresh_ttl: Duration,
}

impl AccountService {
    pub fn new(
        db: Arc<Database>,
        sessions: Arc<dyn SessionStore>,
        resolver: ContextResolver,
        hasher: PasswordHasher,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            db,
            sessions,
            resolver,
            hasher,
            refresh_ttl,
        }
    }

    #[instrument(skip_all, fields(username = %reg.username))]
    pub fn register(&self, reg: Registration) -> Result<UserSummary, AccountError> {
        let username = reg.username.trim().to_string();
        if username.is_empty() {
            return Err(AccountError::Validation("Username cannot be empty.".to_string()));
        }
        if !is_plausible_email(&reg.email) {
            return Err(AccountError::Validation("Enter a valid email address.".to_string()));
        }
        PasswordHasher::check_policy(&reg.password)?;
        let membership = match (reg.role, reg.org_id) {
            (None, None) => None,
            (Some(role), Some(org)) => Some((role, org)),
            (None, Some(_)) => {
                return Err(AccountError::Validation(
                    "role is required when org_id is provided.".to_string(),
                ));
            }
            (Some(_), None) => {
                return Err(AccountError::Validation(
                    "org_id is required when role is provided.".to_string(),
                ));
            }
        };
        let password_hash = self.hasher.hash(&reg.password)?;

        let user = self.db.transaction(|tx| {
            if tx.find_by_username(&username)?.is_some() {
                return Err(AccountError::Conflict(
                    "A user with that username already exists.".to_string(),
                ));
            }
            if tx.find_by_email(&reg.email)?.is_some() {
                return Err(AccountError::Conflict(
                    "A user with that email already exists.".to_string(),
                ));
            }
            if let Some((_, org)) = &membership {
                if tx.organization(org)?.is_none() {
                    return Err(AccountError::OrganizationNotFound);
                }
            }
            let mut new = NewUser::new(&username, &reg.email, &password_hash);
            new.first_name = reg.first_name.trim().to_string();
            new.last_name = reg.last_name.trim().to_string();
            let user = tx.create_user(new).map_err(|e| match e {
                StoreError::Conflict(field) => {
                    AccountError::Conflict(format!("A user with that {field} already exists."))
                }
                other => AccountError::Storage(other),
            })?;
            if let Some((role, org)) = &membership {
                tx.assign(user.id, org, *role)?;
            }
            Ok::<_, AccountError>(user)
        })?;

        info!(user_id = %user.id, "user registered");
        Ok(user.summary())
    }

    /// Check a username-or-email and password pair.
    pub fn verify_credentials(&self, username_or_email: &str, password: &str) -> Result<User, AccountError> {
        let user = self
            .db
            .read(|tx| tx.find_by_login(username_or_email))?
            .filter(|u| self.hasher.verify(password, &u.password_hash))
            .ok_or(AccountError::InvalidCredentials)?;
        if !user.is_active() {
            return Err(AccountError::UserInactive);
        }
        Ok(user)
    }

    #[instrument(skip_all)]
    pub fn login(
        &self,
        username_or_email: &str,
        password: &str,
        org_id: Option<&OrgId>,
    ) -> Result<LoginOutcome, AccountError> {
        let user = match self.verify_credentials(username_or_email, password) {
            Ok(user) => user,
            Err(e) => {
                warn!(reason = "invalid_login", error = %e, "login rejected");
                return Err(e);
            }
        };
        let (org_id, role) = self.resolver.resolve_login(user.id, org_id)?;

        let access_token = self.resolver.codec().issue(user.id, &org_id, role)?;
        let refresh_token = self.issue_refresh(user.id, &org_id)?;
        let session = self.sessions.create(user.id, Some(org_id.clone()))?;

        info!(user_id = %user.id, org_id = %org_id, role = %role, "login succeeded");
        Ok(LoginOutcome {
            access_token,
            refresh_token,
            user_id: user.id,
            org_id,
            role,
            session_id: session.id,
        })
    }

    fn issue_refresh(&self, user_id: UserId, org_id: &OrgId) -> Result<String, AccountError> {
        let token = generate_secure_token();
        let now = Utc::now();
        let record = RefreshRecord {
            digest: token_digest(&token),
            user_id,
            org_id: org_id.clone(),
            issued_at: now,
            expires_at: now + self.refresh_ttl,
            last_used_at: None,
            use_count: 0,
            revoked_at: None,
        };
        self.db.transaction(|tx| {
            let pruned = tx.prune_refresh(now)?;
            if pruned > 0 {
                debug!(pruned, "expired refresh records pruned");
            }
            tx.record_refresh(record)
        })?;
        Ok(token)
    }

    /// Exchange a live refresh token for a fresh access token. The role is
    /// re-read from the membership store.
    #[instrument(skip_all)]
    pub fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AccountError> {
        let token = refresh_token.trim();
        if token.is_empty() {
            return Err(AccountError::RefreshTokenRequired);
        }
        let digest = token_digest(token);
        let now = Utc::now();

        let (user_id, org_id, role) = self.db.transaction(|tx| {
            let record = tx
                .refresh_record(&digest)?
                .filter(|r| r.is_live(now))
                .ok_or(AccountError::InvalidRefreshToken)?;
            let active = tx.user(record.user_id)?.is_some_and(|u| u.is_active());
            if !active {
                return Err(AccountError::InvalidRefreshToken);
            }
            let role = tx
                .lookup(record.user_id, &record.org_id)?
                .ok_or(AccountError::InvalidRefreshToken)?;
            tx.mark_refresh_used(&digest, now)?;
            Ok((record.user_id, record.org_id, role))
        })?;

        let access_token = self.resolver.codec().issue(user_id, &org_id, role)?;
        info!(user_id = %user_id, org_id = %org_id, "access token refreshed");
        Ok(RefreshOutcome {
            access_token,
            org_id,
            role,
        })
    }

    /// Revoke the refresh token and drop the session, if one was presented.
    #[instrument(skip_all)]
    pub fn logout(&self, refresh_token: Option<&str>, session_id: Option<&str>) -> Result<(), AccountError> {
        let token = refresh_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AccountError::RefreshTokenRequired)?;
        let digest = token_digest(token);
        let now = Utc::now();

        self.db.transaction(|tx| {
            let live = tx.refresh_record(&digest)?.is_some_and(|r| r.is_live(now));
            if !live {
                return Err(AccountError::LogoutRejected);
            }
            tx.revoke_refresh(&digest, now)?;
            Ok(())
        })?;

        if let Some(id) = session_id {
            self.sessions.destroy(id)?;
        }
        info!("logout completed");
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Harness;

    #[test]
    fn duplicate_registration_is_rejected_before_any_write() {
        let h = Harness::new();
        h.register("frank", "frank@example.com");

        let again = h.accounts.register(Registration {
            username: "Frank".to_string(),
            email: "someone@example.com".to_string(),
            password: "password-123".to_string(),
            ..Default::default()
        });

        assert!(matches!(again, Err(AccountError::Conflict(_))));
        assert_eq!(h.tables().users.len(), 1);
    }

    #[test]
    fn registration_with_unknown_org_writes_nothing() {
        let h = Harness::new();

        let result = h.accounts.register(Registration {
            username: "gina".to_string(),
            email: "gina@example.com".to_string(),
            password: "password-123".to_string(),
            role: Some(Role::Viewer),
            org_id: Some(OrgId::generate()),
            ..Default::default()
        });

        assert_eq!(result, Err(AccountError::OrganizationNotFound));
        assert!(h.tables().users.is_empty());
    }

    #[test]
    fn login_picks_single_org_and_rejects_bad_password() {
        let h = Harness::new();
        let admin = h.register("hank", "hank@example.com");
        let org = h.create_org(admin);

        let outcome = h.accounts.login("hank", "password-123", None).unwrap();
        assert_eq!(outcome.org_id, org);
        assert_eq!(outcome.role, Role::OrgAdmin);
        assert!(h.sessions.get(&outcome.session_id).unwrap().is_some());

        assert_eq!(
            h.accounts.login("hank", "wrong-password", None).unwrap_err(),
            AccountError::InvalidCredentials
        );
    }

    #[test]
    fn login_with_two_orgs_is_ambiguous() {
        let h = Harness::new();
        let user = h.register("ivy", "ivy@example.com");
        h.create_org(user);
        let second = h.create_org(user);

        assert_eq!(
            h.accounts.login("ivy@example.com", "password-123", None).unwrap_err(),
            AccountError::Login(LoginError::AmbiguousOrganization { count: 2 })
        );
        let chosen = h.accounts.login("ivy", "password-123", Some(&second)).unwrap();
        assert_eq!(chosen.org_id, second);
    }

    #[test]
    fn refresh_rereads_role_and_logout_revokes() {
        let h = Harness::new();
        let admin = h.register("jack", "jack@example.com");
        let org = h.create_org(admin);
        let login = h.accounts.login("jack", "password-123", None).unwrap();

        h.db.transaction(|tx| tx.assign(admin, &org, Role::Finance)).unwrap();
        let refreshed = h.accounts.refresh(&login.refresh_token).unwrap();
        assert_eq!(refreshed.role, Role::Finance);

        h.accounts
            .logout(Some(&login.refresh_token), Some(&login.session_id))
            .unwrap();

        assert_eq!(
            h.accounts.refresh(&login.refresh_token).unwrap_err(),
            AccountError::InvalidRefreshToken
        );
        assert!(h.sessions.get(&login.session_id).unwrap().is_none());
        assert_eq!(
            h.accounts.logout(Some(&login.refresh_token), None).unwrap_err(),
            AccountError::LogoutRejected
        );
    }

    #[test]
    fn refresh_ledger_counts_uses() {
        let h = Harness::new();
        let admin = h.register("kate", "kate@example.com");
        h.create_org(admin);
        let login = h.accounts.login("kate", "password-123", None).unwrap();

        h.accounts.refresh(&login.refresh_token).unwrap();
        h.accounts.refresh(&login.refresh_token).unwrap();

        let record = h
            .db
            .read(|tx| tx.refresh_record(&token_digest(&login.refresh_token)))
            .unwrap()
            .unwrap();
        assert_eq!(record.use_count, 2);
        assert!(record.revoked_at.is_none());
    }

    #[test]
    fn issuing_a_refresh_token_prunes_expired_records() {
        let h = Harness::new();
        let admin = h.register("lena", "lena@example.com");
        let org = h.create_org(admin);
        let past = Utc::now() - Duration::days(30);
        h.db.transaction(|tx| {
            tx.record_refresh(RefreshRecord {
                digest: "stale".to_string(),
                user_id: admin,
                org_id: org.clone(),
                issued_at: past,
                expires_at: past + Duration::days(7),
                last_used_at: None,
                use_count: 0,
                revoked_at: None,
            })
        })
        .unwrap();

        let login = h.accounts.login("lena", "password-123", None).unwrap();

        let ledger = h.tables().refresh_tokens;
        assert!(!ledger.contains_key("stale"));
        assert!(ledger.contains_key(&token_digest(&login.refresh_token)));
    }
}
