use serde::Serialize;

use orggate_core::{OrgId, UserId};

use crate::Role;

/// Which credential bound the tenant context of a request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Token,
    Session,
    Header,
}

impl ContextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSource::Token => "token",
            ContextSource::Session => "session",
            ContextSource::Header => "header",
        }
    }
}

/// An authenticated caller whose organization has not (yet) been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub source: ContextSource,
}

/// The resolved (user, organization, role) triple for one request.
///
/// Built once by the resolver and then only read: handlers receive it by
/// reference and there is no way to re-bind it mid-request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantContext {
    user_id: UserId,
    org_id: OrgId,
    role: Role,
    source: ContextSource,
}

impl TenantContext {
    pub fn new(user_id: UserId, org_id: OrgId, role: Role, source: ContextSource) -> Self {
        Self {
            user_id,
            org_id,
            role,
            source,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn org_id(&self) -> &OrgId {
        &self.org_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn source(&self) -> ContextSource {
        self.source
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::OrgAdmin
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            source: self.source,
        }
    }
}
