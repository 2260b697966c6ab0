//! Organization: the tenant boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{OrgId, UserId};

/// Organization lifecycle status.
///
/// Organizations are never removed from storage; retiring one flips the status
/// to `Deleted` and keeps the row so memberships and invites stay resolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationStatus {
    #[default]
    Active,
    Suspended,
    Deleted,
}

impl core::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OrganizationStatus::Active => f.write_str("ACTIVE"),
            OrganizationStatus::Suspended => f.write_str("SUSPENDED"),
            OrganizationStatus::Deleted => f.write_str("DELETED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    /// Upper-cased country code.
    pub country: String,
    /// Upper-cased currency code.
    pub base_currency: String,
    /// IANA timezone identifier.
    pub timezone: String,
    pub status: OrganizationStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn is_active(&self) -> bool {
        self.status == OrganizationStatus::Active
    }

    /// Apply an already-validated settings patch.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(country) = patch.country {
            self.country = country;
        }
        if let Some(currency) = patch.base_currency {
            self.base_currency = currency;
        }
        if let Some(timezone) = patch.timezone {
            self.timezone = timezone;
        }
    }
}

/// Partial update of organization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub name: Option<String>,
    pub country: Option<String>,
    pub base_currency: Option<String>,
    pub timezone: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.country.is_none()
            && self.base_currency.is_none()
            && self.timezone.is_none()
    }
}

/// Trim and upper-case a country/currency code.
pub fn normalize_code(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Allowed country and currency codes.
///
/// An empty list means "any code is accepted".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodePolicy {
    pub allowed_countries: Vec<String>,
    pub allowed_currencies: Vec<String>,
}

impl CodePolicy {
    pub fn new(countries: impl IntoIterator<Item = String>, currencies: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed_countries: normalize_all(countries),
            allowed_currencies: normalize_all(currencies),
        }
    }

    pub fn country(&self, raw: &str) -> DomainResult<String> {
        check_code(raw, &self.allowed_countries, "country")
    }

    pub fn currency(&self, raw: &str) -> DomainResult<String> {
        check_code(raw, &self.allowed_currencies, "base_currency")
    }
}

fn normalize_all(values: impl IntoIterator<Item = String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| normalize_code(&v))
        .filter(|v| !v.is_empty())
        .collect()
}

fn check_code(raw: &str, allowed: &[String], field: &str) -> DomainResult<String> {
    let code = normalize_code(raw);
    if code.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if code.len() > 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::validation(format!("{field} must be a 2-3 letter code")));
    }
    if !allowed.is_empty() && !allowed.contains(&code) {
        let mut sorted = allowed.to_vec();
        sorted.sort();
        return Err(DomainError::validation(format!(
            "{field} must be one of: {}.",
            sorted.join(", ")
        )));
    }
    Ok(code)
}
