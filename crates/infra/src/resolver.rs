//! Context Resolver: request credentials -> (user, organization, role).
//!
//! Precedence is token, then session, then header. Once a token or a session
//! has bound an organization the header is never consulted. Token claims are
//! re-validated against the membership store on every request, so a demotion
//! or removal takes effect before the token expires.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use orggate_auth::{ContextSource, Identity, Role, TenantContext, TokenCodec, TokenError};
use orggate_core::{OrgId, UserId};

use crate::db::{Database, StoreError};
use crate::sessions::SessionStore;
use crate::store::{MembershipStore, OrganizationStore, UserDirectory};

/// Credentials extracted from one request. Transport-agnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub bearer: Option<String>,
    pub session_id: Option<String>,
    pub org_header: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    NoCredentials,
    MalformedHeader,
    TokenExpired,
    TokenInvalid,
    MissingTokenContext,
    UserNotFound,
    UserInactive,
}

impl UnauthenticatedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnauthenticatedReason::NoCredentials => "no_credentials",
            UnauthenticatedReason::MalformedHeader => "malformed_authorization_header",
            UnauthenticatedReason::TokenExpired => "token_expired",
            UnauthenticatedReason::TokenInvalid => "token_invalid",
            UnauthenticatedReason::MissingTokenContext => "token_missing_context",
            UnauthenticatedReason::UserNotFound => "user_not_found",
            UnauthenticatedReason::UserInactive => "user_inactive",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            UnauthenticatedReason::NoCredentials => "Authentication credentials were not provided.",
            UnauthenticatedReason::MalformedHeader => "Invalid token header.",
            UnauthenticatedReason::TokenExpired => "Token has expired.",
            UnauthenticatedReason::TokenInvalid => "Invalid token.",
            UnauthenticatedReason::MissingTokenContext => "Token is missing organization context.",
            UnauthenticatedReason::UserNotFound => "User not found.",
            UnauthenticatedReason::UserInactive => "User is inactive.",
        }
    }
}

impl From<&TokenError> for UnauthenticatedReason {
    fn from(err: &TokenError) -> Self {
        match err {
            TokenError::Expired => UnauthenticatedReason::TokenExpired,
            TokenError::MissingContext => UnauthenticatedReason::MissingTokenContext,
            TokenError::NotYetValid | TokenError::Invalid(_) | TokenError::Signing(_) => {
                UnauthenticatedReason::TokenInvalid
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("{}", .0.message())]
    Unauthenticated(UnauthenticatedReason),

    /// No token claims, no session org and no header.
    #[error("Organization context is required.")]
    OrgContextRequired,

    /// Session or header named an organization the user does not belong to.
    #[error("User does not belong to the specified organization.")]
    NoOrgContext,

    /// Token names an organization with no matching membership.
    #[error("Token organization context does not match any membership.")]
    InvalidOrgContext,

    /// Token role differs from the stored membership role.
    #[error("Token role does not match the current membership role.")]
    RoleMismatch,

    #[error("Organization is not active.")]
    OrganizationInactive,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl ContextError {
    /// Stable log/response code.
    pub fn reason(&self) -> &'static str {
        match self {
            ContextError::Unauthenticated(r) => r.as_str(),
            ContextError::OrgContextRequired => "org_context_required",
            ContextError::NoOrgContext => "no_org_context",
            ContextError::InvalidOrgContext => "invalid_org_context",
            ContextError::RoleMismatch => "role_mismatch",
            ContextError::OrganizationInactive => "organization_inactive",
            ContextError::Storage(_) => "storage",
        }
    }
}

/// Login-time organization selection failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("Organization not found.")]
    OrganizationNotFound,

    #[error("Organization is not active.")]
    OrganizationInactive,

    #[error("User does not belong to the specified organization.")]
    NotAMember,

    #[error("User does not belong to any organization.")]
    NoMemberships,

    #[error("Multiple organizations found. Provide org_id to select one.")]
    AmbiguousOrganization { count: usize },

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Clone)]
pub struct ContextResolver {
    db: Arc<Database>,
    sessions: Arc<dyn SessionStore>,
    codec: TokenCodec,
}

impl ContextResolver {
    pub fn new(db: Arc<Database>, sessions: Arc<dyn SessionStore>, codec: TokenCodec) -> Self {
        Self { db, sessions, codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolve the tenant context for a tenant-scoped request.
    pub fn resolve(&self, creds: &Credentials) -> Result<TenantContext, ContextError> {
        let result = self.resolve_inner(creds);
        match &result {
            Ok(ctx) => debug!(
                user_id = %ctx.user_id(),
                org_id = %ctx.org_id(),
                role = %ctx.role(),
                source = ctx.source().as_str(),
                "tenant context resolved"
            ),
            Err(ContextError::Storage(e)) => {
                error!(error = %e, "tenant context resolution failed on storage")
            }
            Err(e) => warn!(reason = e.reason(), "tenant context rejected"),
        }
        result
    }

    fn resolve_inner(&self, creds: &Credentials) -> Result<TenantContext, ContextError> {
        if let Some(token) = &creds.bearer {
            return self.resolve_token(token, creds.org_header.as_deref());
        }

        // Unknown and expired sessions look the same.
        let Some(session) = self.session(creds)? else {
            return Err(ContextError::Unauthenticated(UnauthenticatedReason::NoCredentials));
        };

        let (org_id, source) = match (&session.org_id, header_org(creds.org_header.as_deref())) {
            (Some(bound), header) => {
                if header.as_ref().is_some_and(|h| h != bound) {
                    debug!(session_org = %bound, "ignoring org header that differs from session");
                }
                (bound.clone(), ContextSource::Session)
            }
            (None, Some(header)) => (header, ContextSource::Header),
            (None, None) => return Err(ContextError::OrgContextRequired),
        };

        self.db.read(|tx| {
            ensure_active_user(tx.user(session.user_id)?)?;
            let role = tx
                .lookup(session.user_id, &org_id)?
                .ok_or(ContextError::NoOrgContext)?;
            let active = tx.organization(&org_id)?.is_some_and(|o| o.is_active());
            if !active {
                return Err(ContextError::OrganizationInactive);
            }
            Ok(TenantContext::new(session.user_id, org_id.clone(), role, source))
        })
    }

    fn session(&self, creds: &Credentials) -> Result<Option<crate::sessions::Session>, ContextError> {
        match creds.session_id.as_deref() {
            Some(id) => Ok(self.sessions.get(id)?),
            None => Ok(None),
        }
    }

    fn resolve_token(&self, token: &str, header: Option<&str>) -> Result<TenantContext, ContextError> {
        let claims = self
            .codec
            .parse(token)
            .map_err(|e| ContextError::Unauthenticated(UnauthenticatedReason::from(&e)))?;

        if header_org(header).is_some_and(|h| h != claims.org_id) {
            debug!(token_org = %claims.org_id, "ignoring org header that differs from token");
        }

        self.db.read(|tx| {
            ensure_active_user(tx.user(claims.user_id)?)?;
            let stored = tx
                .lookup(claims.user_id, &claims.org_id)?
                .ok_or(ContextError::InvalidOrgContext)?;
            if stored != claims.role {
                return Err(ContextError::RoleMismatch);
            }
            let org = tx
                .organization(&claims.org_id)?
                .ok_or(ContextError::InvalidOrgContext)?;
            if !org.is_active() {
                return Err(ContextError::OrganizationInactive);
            }
            Ok(TenantContext::new(
                claims.user_id,
                claims.org_id.clone(),
                claims.role,
                ContextSource::Token,
            ))
        })
    }

    /// Identity only, for paths exempt from tenant enforcement.
    ///
    /// Returns `Ok(None)` when no credential is present.
    pub fn resolve_identity(&self, creds: &Credentials) -> Result<Option<Identity>, ContextError> {
        let identity = if let Some(token) = &creds.bearer {
            let claims = self
                .codec
                .parse(token)
                .map_err(|e| ContextError::Unauthenticated(UnauthenticatedReason::from(&e)))?;
            Identity {
                user_id: claims.user_id,
                source: ContextSource::Token,
            }
        } else if let Some(session) = self.session(creds)? {
            Identity {
                user_id: session.user_id,
                source: ContextSource::Session,
            }
        } else {
            return Ok(None);
        };

        self.db
            .read(|tx| ensure_active_user(tx.user(identity.user_id)?))?;
        Ok(Some(identity))
    }

    /// Pick the organization for a login.
    ///
    /// With an explicit organization the user must belong to it. Without one,
    /// exactly one membership resolves automatically; more than one is
    /// ambiguous. Memberships are considered most recently assigned first.
    pub fn resolve_login(&self, user: UserId, requested: Option<&OrgId>) -> Result<(OrgId, Role), LoginError> {
        let outcome = self.db.read(|tx| match requested {
            Some(org_id) => {
                let org = tx.organization(org_id)?.ok_or(LoginError::OrganizationNotFound)?;
                if !org.is_active() {
                    return Err(LoginError::OrganizationInactive);
                }
                let role = tx.lookup(user, org_id)?.ok_or(LoginError::NotAMember)?;
                Ok((org_id.clone(), role))
            }
            None => {
                let mut memberships = Vec::new();
                for m in tx.list_for_user(user)? {
                    if tx.organization(&m.org_id)?.is_some_and(|o| o.is_active()) {
                        memberships.push(m);
                    }
                }
                match memberships.as_slice() {
                    [] => Err(LoginError::NoMemberships),
                    [only] => Ok((only.org_id.clone(), only.role)),
                    many => Err(LoginError::AmbiguousOrganization { count: many.len() }),
                }
            }
        });
        if let Err(e) = &outcome {
            warn!(user_id = %user, error = %e, "login organization selection failed");
        }
        outcome
    }
}

fn header_org(header: Option<&str>) -> Option<OrgId> {
    header.and_then(|h| h.parse::<OrgId>().ok())
}

fn ensure_active_user(user: Option<orggate_auth::User>) -> Result<(), ContextError> {
    match user {
        None => Err(ContextError::Unauthenticated(UnauthenticatedReason::UserNotFound)),
        Some(u) if !u.is_active() => Err(ContextError::Unauthenticated(UnauthenticatedReason::UserInactive)),
        Some(_) => Ok(()),
    }
}
