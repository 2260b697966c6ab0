//! Token Codec: signed, expiring access tokens bound to one tenant context.
//!
//! Access tokens are HS256 JWTs carrying `user_id`, `org_id`, `role` and `iat`.
//! The expiry is not embedded; it is computed at parse time from the codec's
//! configured TTL.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use thiserror::Error;

use orggate_core::{OrgId, UserId};

use crate::Role;
use crate::claims::{TenantClaims, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token issued in the future")]
    NotYetValid,

    /// Signature, encoding or identity claim problem.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// Well-signed token that carries no tenant (`org_id`/`role`) claims.
    #[error("token carries no organization context")]
    MissingContext,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Raw decoded payload; every field optional so missing claims can be told
/// apart from malformed ones.
#[derive(Debug, Deserialize)]
struct RawClaims {
    user_id: Option<String>,
    org_id: Option<String>,
    role: Option<String>,
    iat: Option<i64>,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: UserId, org_id: &OrgId, role: Role) -> Result<String, TokenError> {
        self.issue_at(user_id, org_id, role, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: UserId,
        org_id: &OrgId,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = TenantClaims::new(user_id, org_id.clone(), role, issued_at);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn parse(&self, token: &str) -> Result<TenantClaims, TokenError> {
        self.parse_at(token, Utc::now())
    }

    pub fn parse_at(&self, token: &str, now: DateTime<Utc>) -> Result<TenantClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let raw = decode::<RawClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        let user_id = raw
            .user_id
            .ok_or_else(|| TokenError::Invalid("missing user_id claim".to_string()))?
            .parse::<UserId>()
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        let iat = raw
            .iat
            .ok_or_else(|| TokenError::Invalid("missing iat claim".to_string()))?;

        let (org_id, role) = match (raw.org_id, raw.role) {
            (Some(org), Some(role)) => (org, role),
            _ => return Err(TokenError::MissingContext),
        };
        let org_id = org_id
            .parse::<OrgId>()
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        let role = role
            .parse::<Role>()
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        let claims = TenantClaims {
            user_id,
            org_id,
            role,
            iat,
        };
        validate_claims(&claims, self.ttl, now)?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    const SECRET: &[u8] = b"test-secret";

    fn codec(ttl_secs: i64) -> TokenCodec {
        TokenCodec::new(SECRET, Duration::seconds(ttl_secs))
    }

    #[test]
    fn issued_token_parses_back_to_its_claims() {
        let codec = codec(3600);
        let user = UserId::new();
        let org = OrgId::generate();

        let token = codec.issue(user, &org, Role::Approver).unwrap();
        let claims = codec.parse(&token).unwrap();

        assert_eq!(claims.user_id, user);
        assert_eq!(claims.org_id, org);
        assert_eq!(claims.role, Role::Approver);
    }

    #[test]
    fn token_past_ttl_is_expired() {
        let codec = codec(1);
        let token = codec
            .issue(UserId::new(), &OrgId::generate(), Role::Viewer)
            .unwrap();

        std::thread::sleep(std::time::Duration::from_secs(2));

        assert_eq!(codec.parse(&token), Err(TokenError::Expired));
    }

    #[test]
    fn ttl_is_read_by_the_validator_not_the_token() {
        let issued = Utc::now() - Duration::seconds(120);
        let token = codec(3600)
            .issue_at(UserId::new(), &OrgId::generate(), Role::Finance, issued)
            .unwrap();

        assert!(codec(3600).parse(&token).is_ok());
        assert_eq!(codec(60).parse(&token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = codec(60)
            .issue(UserId::new(), &OrgId::generate(), Role::Finance)
            .unwrap();
        let other = TokenCodec::new(b"another-secret", Duration::seconds(60));

        assert!(matches!(other.parse(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(codec(60).parse("not-a-jwt"), Err(TokenError::Invalid(_))));
    }

    #[derive(Serialize)]
    struct IdentityOnly {
        user_id: String,
        iat: i64,
    }

    #[derive(Serialize)]
    struct BadRole {
        user_id: String,
        org_id: String,
        role: String,
        iat: i64,
    }

    #[test]
    fn token_without_tenant_claims_is_missing_context() {
        let payload = IdentityOnly {
            user_id: UserId::new().to_string(),
            iat: Utc::now().timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec(60).parse(&token), Err(TokenError::MissingContext));
    }

    #[test]
    fn token_with_unknown_role_is_invalid_not_missing() {
        let payload = BadRole {
            user_id: UserId::new().to_string(),
            org_id: OrgId::generate().to_string(),
            role: "SUPERUSER".to_string(),
            iat: Utc::now().timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(codec(60).parse(&token), Err(TokenError::Invalid(_))));
    }
}
