//! Process configuration, read from environment variables.
//!
//! Every value has a default so a bare `cargo run` starts a usable dev server.

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

use orggate_auth::PasswordConfig;
use orggate_infra::SmtpConfig;

use crate::context::PathPolicy;

const DEV_TOKEN_SECRET: &str = "dev-secret";

pub const DEFAULT_EXEMPT_PATHS: &[&str] = &[
    "/api/accounts/register",
    "/api/accounts/login",
    "/api/accounts/token/refresh",
    "/api/accounts/logout",
    "/api/health/live",
    "/api/health/ready",
    "/api/schema",
    "/api/docs",
    "/api/organizations/invites/accept",
    "/api/organizations",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidSeconds { name: &'static str, value: String },

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("USE_PERSISTENT_STORES is set but DATABASE_URL is missing")]
    MissingDatabaseUrl,
}

/// Postgres settings; present only when persistent stores are enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub token_secret: String,
    pub token_ttl: Duration,
    pub refresh_ttl: Duration,
    pub session_ttl: Duration,
    pub org_header: String,
    pub session_cookie: String,
    pub paths: PathPolicy,
    pub allowed_countries: Vec<String>,
    pub allowed_currencies: Vec<String>,
    pub default_base_currency: String,
    pub default_timezone: String,
    pub invite_accept_url_base: String,
    pub from_email: String,
    pub password: PasswordConfig,
    /// `None` keeps every store in memory.
    pub database: Option<DatabaseConfig>,
    /// `None` falls back to logging invite mail.
    pub smtp: Option<SmtpConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            token_secret: DEV_TOKEN_SECRET.to_string(),
            token_ttl: Duration::seconds(3600),
            refresh_ttl: Duration::seconds(604_800),
            session_ttl: Duration::seconds(1_209_600),
            org_header: "X-Org-Id".to_string(),
            session_cookie: "orggate_session".to_string(),
            paths: PathPolicy::new(
                ["/api/"],
                DEFAULT_EXEMPT_PATHS.iter().copied(),
                ["/api/internal/"],
                ["/api/vendor/"],
            ),
            allowed_countries: Vec::new(),
            allowed_currencies: Vec::new(),
            default_base_currency: String::new(),
            default_timezone: "UTC".to_string(),
            invite_accept_url_base: String::new(),
            from_email: "noreply@orggate.local".to_string(),
            password: PasswordConfig::default(),
            database: None,
            smtp: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset or blank values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let token_secret = match var("TOKEN_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("TOKEN_SECRET not set; using insecure dev default");
                defaults.token_secret
            }
        };

        let paths = PathPolicy::new(
            var("ORG_CONTEXT_ENFORCED_PREFIXES").map_or_else(|| vec!["/api/".to_string()], |v| csv(&v)),
            var("ORG_CONTEXT_EXEMPT_PATHS").map_or_else(
                || DEFAULT_EXEMPT_PATHS.iter().map(|p| p.to_string()).collect(),
                |v| csv(&v),
            ),
            var("INTERNAL_API_PREFIXES").map_or_else(|| vec!["/api/internal/".to_string()], |v| csv(&v)),
            var("VENDOR_API_PREFIXES").map_or_else(|| vec!["/api/vendor/".to_string()], |v| csv(&v)),
        );

        let database = if flag(var("USE_PERSISTENT_STORES").as_deref(), false) {
            Some(DatabaseConfig {
                url: var("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?,
                max_connections: number(&var, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
            })
        } else {
            None
        };

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                port: number(&var, "SMTP_PORT")?.unwrap_or(587),
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
                starttls: flag(var("SMTP_STARTTLS").as_deref(), true),
                ..SmtpConfig::new(host)
            }),
            None => None,
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            token_secret,
            token_ttl: seconds(&var, "AUTH_TOKEN_TTL_SECONDS")?.unwrap_or(defaults.token_ttl),
            refresh_ttl: seconds(&var, "REFRESH_TOKEN_TTL_SECONDS")?.unwrap_or(defaults.refresh_ttl),
            session_ttl: seconds(&var, "SESSION_TTL_SECONDS")?.unwrap_or(defaults.session_ttl),
            org_header: var("ORG_CONTEXT_HEADER").unwrap_or(defaults.org_header),
            session_cookie: var("SESSION_COOKIE_NAME").unwrap_or(defaults.session_cookie),
            paths,
            allowed_countries: var("ALLOWED_COUNTRIES").map(|v| upper_csv(&v)).unwrap_or_default(),
            allowed_currencies: var("ALLOWED_CURRENCIES").map(|v| upper_csv(&v)).unwrap_or_default(),
            default_base_currency: var("DEFAULT_BASE_CURRENCY")
                .map(|v| v.to_ascii_uppercase())
                .unwrap_or(defaults.default_base_currency),
            default_timezone: var("DEFAULT_ORG_TIMEZONE").unwrap_or(defaults.default_timezone),
            invite_accept_url_base: var("INVITE_ACCEPT_URL_BASE").unwrap_or(defaults.invite_accept_url_base),
            from_email: var("DEFAULT_FROM_EMAIL").or_else(|| var("SMTP_FROM")).unwrap_or(defaults.from_email),
            password: defaults.password,
            database,
            smtp,
        })
    }

    /// Configuration for tests: fixed secret and cheap password hashing.
    pub fn for_tests() -> Self {
        Self {
            token_secret: "test-secret".to_string(),
            password: PasswordConfig::fast(),
            ..Self::default()
        }
    }
}

fn seconds(var: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = var(name) else {
        return Ok(None);
    };
    match raw.parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::seconds(secs))),
        _ => Err(ConfigError::InvalidSeconds { name, value: raw }),
    }
}

fn number<N: std::str::FromStr + PartialOrd + Default>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<N>, ConfigError> {
    let Some(raw) = var(name) else {
        return Ok(None);
    };
    match raw.parse::<N>() {
        Ok(n) if n > N::default() => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}

/// `true`/`1`/`yes` and `false`/`0`/`no`, case-insensitive; anything else
/// keeps the default.
fn flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("true" | "1" | "yes") => true,
        Some("false" | "0" | "no") => false,
        _ => default,
    }
}

fn csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn upper_csv(raw: &str) -> Vec<String> {
    csv(raw).into_iter().map(|s| s.to_ascii_uppercase()).collect()
}
