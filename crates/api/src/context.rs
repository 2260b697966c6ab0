//! Request-side inputs to tenant resolution: credential extraction from
//! headers and the path rules deciding where a tenant context is required.

use axum::http::{HeaderMap, header};

use orggate_auth::PathClass;
use orggate_infra::{Credentials, UnauthenticatedReason};

use crate::config::AppConfig;

/// Which paths need a tenant context and how they are classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPolicy {
    enforced_prefixes: Vec<String>,
    exempt_paths: Vec<String>,
    internal_prefixes: Vec<String>,
    vendor_prefixes: Vec<String>,
}

impl PathPolicy {
    pub fn new(
        enforced_prefixes: impl IntoIterator<Item = impl Into<String>>,
        exempt_paths: impl IntoIterator<Item = impl Into<String>>,
        internal_prefixes: impl IntoIterator<Item = impl Into<String>>,
        vendor_prefixes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            enforced_prefixes: enforced_prefixes.into_iter().map(Into::into).collect(),
            exempt_paths: exempt_paths
                .into_iter()
                .map(|p| normalize(&p.into()).to_string())
                .collect(),
            internal_prefixes: internal_prefixes.into_iter().map(Into::into).collect(),
            vendor_prefixes: vendor_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Exempt paths match exactly, modulo a trailing slash.
    pub fn is_exempt(&self, path: &str) -> bool {
        let path = normalize(path);
        self.exempt_paths.iter().any(|p| p == path)
    }

    pub fn should_enforce(&self, path: &str) -> bool {
        !self.is_exempt(path) && matches_prefix(&self.enforced_prefixes, path)
    }

    pub fn classify(&self, path: &str) -> PathClass {
        if matches_prefix(&self.internal_prefixes, path) {
            PathClass::Internal
        } else if matches_prefix(&self.vendor_prefixes, path) {
            PathClass::Vendor
        } else {
            PathClass::General
        }
    }
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// `/api/internal` matches the prefix `/api/internal/`.
fn matches_prefix(prefixes: &[String], path: &str) -> bool {
    let with_slash = format!("{}/", normalize(path));
    prefixes
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()) || with_slash.starts_with(prefix.as_str()))
}

/// Pull every credential the request carries. Precedence between them is
/// the resolver's business; this only reads headers.
pub fn extract_credentials(headers: &HeaderMap, config: &AppConfig) -> Result<Credentials, UnauthenticatedReason> {
    Ok(Credentials {
        bearer: extract_bearer(headers)?,
        session_id: extract_cookie(headers, &config.session_cookie),
        org_header: headers
            .get(config.org_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    })
}

/// `Bearer <token>` or `Token <token>`. Any other scheme counts as absent.
fn extract_bearer(headers: &HeaderMap) -> Result<Option<String>, UnauthenticatedReason> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| UnauthenticatedReason::MalformedHeader)?;

    let mut parts = value.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return Ok(None);
    }
    match (parts.next(), parts.next()) {
        (Some(token), None) => Ok(Some(token.to_string())),
        _ => Err(UnauthenticatedReason::MalformedHeader),
    }
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn policy() -> PathPolicy {
        AppConfig::default().paths
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn exempt_paths_ignore_trailing_slash() {
        let p = policy();
        assert!(!p.should_enforce("/api/accounts/login/"));
        assert!(!p.should_enforce("/api/organizations"));
        assert!(p.should_enforce("/api/organizations/settings"));
        assert!(!p.should_enforce("/metrics"));
    }

    #[test]
    fn paths_are_classified_by_prefix() {
        let p = policy();
        assert_eq!(p.classify("/api/internal/invoices"), PathClass::Internal);
        assert_eq!(p.classify("/api/internal"), PathClass::Internal);
        assert_eq!(p.classify("/api/vendor/invoices/upload"), PathClass::Vendor);
        assert_eq!(p.classify("/api/internals"), PathClass::General);
        assert_eq!(p.classify("/api/whoami"), PathClass::General);
    }

    #[test]
    fn bearer_and_token_schemes_are_accepted() {
        let cfg = AppConfig::default();
        let creds = extract_credentials(&headers(&[("authorization", "Bearer abc")]), &cfg).unwrap();
        assert_eq!(creds.bearer.as_deref(), Some("abc"));

        let creds = extract_credentials(&headers(&[("authorization", "token xyz")]), &cfg).unwrap();
        assert_eq!(creds.bearer.as_deref(), Some("xyz"));
    }

    #[test]
    fn malformed_authorization_is_rejected_and_other_schemes_ignored() {
        let cfg = AppConfig::default();
        assert_eq!(
            extract_credentials(&headers(&[("authorization", "Bearer")]), &cfg),
            Err(UnauthenticatedReason::MalformedHeader)
        );
        assert_eq!(
            extract_credentials(&headers(&[("authorization", "Bearer a b")]), &cfg),
            Err(UnauthenticatedReason::MalformedHeader)
        );
        let creds = extract_credentials(&headers(&[("authorization", "Basic dXNlcjpwdw==")]), &cfg).unwrap();
        assert_eq!(creds.bearer, None);
    }

    #[test]
    fn session_cookie_and_org_header_are_read() {
        let cfg = AppConfig::default();
        let creds = extract_credentials(
            &headers(&[
                ("cookie", "theme=dark; orggate_session=sess-1"),
                ("x-org-id", "  org_abc  "),
            ]),
            &cfg,
        )
        .unwrap();

        assert_eq!(creds.session_id.as_deref(), Some("sess-1"));
        assert_eq!(creds.org_header.as_deref(), Some("org_abc"));
    }

    #[test]
    fn blank_org_header_is_absent() {
        let creds = extract_credentials(&headers(&[("x-org-id", "   ")]), &AppConfig::default()).unwrap();
        assert_eq!(creds, Credentials::default());
    }
}
