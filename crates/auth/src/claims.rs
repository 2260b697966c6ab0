use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use orggate_core::{OrgId, UserId};

use crate::Role;
use crate::token::TokenError;

/// Claim set carried by an access token.
///
/// The expiry is deliberately absent: it is derived from `iat` plus the TTL
/// configured on the validating side, so shortening the TTL takes effect for
/// tokens already in circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantClaims {
    pub user_id: UserId,
    pub org_id: OrgId,
    pub role: Role,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
}

impl TenantClaims {
    pub fn new(user_id: UserId, org_id: OrgId, role: Role, issued_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            org_id,
            role,
            iat: issued_at.timestamp(),
        }
    }

    pub fn expires_at(&self, ttl: Duration) -> i64 {
        self.iat.saturating_add(ttl.num_seconds())
    }
}

/// Clock skew tolerated for an `iat` slightly ahead of the validator.
pub const ISSUED_AT_LEEWAY_SECS: i64 = 5;

/// Validate the time window of already-decoded claims.
pub fn validate_claims(claims: &TenantClaims, ttl: Duration, now: DateTime<Utc>) -> Result<(), TokenError> {
    let now = now.timestamp();
    if claims.iat > now.saturating_add(ISSUED_AT_LEEWAY_SECS) {
        return Err(TokenError::NotYetValid);
    }
    if now > claims.expires_at(ttl) {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(iat: DateTime<Utc>) -> TenantClaims {
        TenantClaims::new(UserId::new(), OrgId::generate(), Role::Finance, iat)
    }

    #[test]
    fn claims_inside_the_window_are_valid() {
        let now = Utc::now();
        let claims = claims_at(now - Duration::seconds(30));
        assert_eq!(validate_claims(&claims, Duration::seconds(60), now), Ok(()));
    }

    #[test]
    fn expiry_is_strictly_after_iat_plus_ttl() {
        let now = Utc::now();
        let claims = claims_at(now - Duration::seconds(60));
        assert_eq!(validate_claims(&claims, Duration::seconds(60), now), Ok(()));
        assert_eq!(
            validate_claims(&claims, Duration::seconds(59), now),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn future_iat_beyond_leeway_is_rejected() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::seconds(ISSUED_AT_LEEWAY_SECS + 10));
        assert_eq!(
            validate_claims(&claims, Duration::hours(1), now),
            Err(TokenError::NotYetValid)
        );
    }
}
