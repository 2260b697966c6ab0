//! Organization lifecycle: create (with the creator's admin membership),
//! settings, suspend and retire.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use orggate_auth::{Role, TenantContext};
use orggate_core::{
    CodePolicy, DomainError, OrgId, Organization, OrganizationStatus, SettingsPatch, UserId,
};

use crate::db::{Database, StoreError};
use crate::store::{MembershipStore, NewOrganization, OrganizationStore, UserDirectory};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrganizationError {
    #[error("{0}")]
    Validation(String),

    #[error("At least one setting must be provided.")]
    EmptyPatch,

    #[error("Organization not found.")]
    NotFound,

    #[error("Creator account not found or inactive.")]
    InvalidCreator,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl From<DomainError> for OrganizationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => OrganizationError::Validation(msg),
        }
    }
}

/// Values applied when a creation request omits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationDefaults {
    /// Empty means "currency is mandatory".
    pub base_currency: String,
    pub timezone: String,
}

impl Default for OrganizationDefaults {
    fn default() -> Self {
        Self {
            base_currency: String::new(),
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateOrganization {
    pub name: String,
    pub country: String,
    pub base_currency: Option<String>,
    pub timezone: Option<String>,
}

pub struct OrganizationService {
    db: Arc<Database>,
    policy: CodePolicy,
    defaults: OrganizationDefaults,
}

impl OrganizationService {
    pub fn new(db: Arc<Database>, policy: CodePolicy, defaults: OrganizationDefaults) -> Self {
        Self { db, policy, defaults }
    }

    /// Create the organization and the creator's ORG_ADMIN membership in one
    /// transaction: if either write fails, neither persists.
    #[instrument(skip_all, fields(creator = %creator))]
    pub fn create(&self, req: CreateOrganization, creator: UserId) -> Result<Organization, OrganizationError> {
        let name = validate_name(&req.name)?;
        let country = self.policy.country(&req.country)?;
        let currency = req
            .base_currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.defaults.base_currency.clone());
        let base_currency = self.policy.currency(&currency)?;
        let timezone = validate_timezone(req.timezone.as_deref().unwrap_or(&self.defaults.timezone))?;

        let org = self.db.transaction(|tx| {
            let active = tx.user(creator)?.is_some_and(|u| u.is_active());
            if !active {
                return Err(OrganizationError::InvalidCreator);
            }
            let org = tx.create_organization(
                NewOrganization {
                    name,
                    country,
                    base_currency,
                    timezone,
                },
                creator,
            )?;
            tx.assign(creator, &org.id, Role::OrgAdmin)?;
            Ok(org)
        })?;

        info!(org_id = %org.id, "organization created");
        Ok(org)
    }

    pub fn get(&self, org_id: &OrgId) -> Result<Organization, OrganizationError> {
        self.db
            .read(|tx| tx.organization(org_id))?
            .ok_or(OrganizationError::NotFound)
    }

    /// Apply a settings patch to the caller's organization. Authorization is
    /// the caller's responsibility.
    #[instrument(skip_all, fields(org_id = %ctx.org_id()))]
    pub fn update_settings(
        &self,
        ctx: &TenantContext,
        patch: SettingsPatch,
    ) -> Result<Organization, OrganizationError> {
        if patch.is_empty() {
            return Err(OrganizationError::EmptyPatch);
        }
        let validated = SettingsPatch {
            name: patch.name.as_deref().map(validate_name).transpose()?,
            country: patch.country.as_deref().map(|c| self.policy.country(c)).transpose()?,
            base_currency: patch
                .base_currency
                .as_deref()
                .map(|c| self.policy.currency(c))
                .transpose()?,
            timezone: patch.timezone.as_deref().map(validate_timezone).transpose()?,
        };

        let org = self.db.transaction(|tx| {
            let mut org = tx.organization(ctx.org_id())?.ok_or(OrganizationError::NotFound)?;
            org.apply(validated);
            tx.update_organization(org.clone())?;
            Ok::<_, OrganizationError>(org)
        })?;
        info!("organization settings updated");
        Ok(org)
    }

    pub fn suspend(&self, org_id: &OrgId) -> Result<Organization, OrganizationError> {
        self.set_status(org_id, OrganizationStatus::Suspended)
    }

    /// Soft delete: status becomes DELETED and the row stays.
    pub fn retire(&self, ctx: &TenantContext) -> Result<Organization, OrganizationError> {
        self.set_status(ctx.org_id(), OrganizationStatus::Deleted)
    }

    fn set_status(&self, org_id: &OrgId, status: OrganizationStatus) -> Result<Organization, OrganizationError> {
        let org = self.db.transaction(|tx| {
            let mut org = tx.organization(org_id)?.ok_or(OrganizationError::NotFound)?;
            org.status = status;
            tx.update_organization(org.clone())?;
            Ok::<_, OrganizationError>(org)
        })?;
        info!(org_id = %org_id, status = %status, "organization status changed");
        Ok(org)
    }
}

fn validate_name(raw: &str) -> Result<String, OrganizationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(OrganizationError::Validation(
            "Organization name cannot be empty.".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Accepts `UTC` and `Area/Location` style identifiers.
fn validate_timezone(raw: &str) -> Result<String, OrganizationError> {
    let tz = raw.trim();
    let well_formed = !tz.is_empty()
        && tz
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'))
        && !tz.starts_with('/')
        && !tz.ends_with('/');
    if !well_formed {
        return Err(OrganizationError::Validation(format!("Unknown timezone '{raw}'.")));
    }
    Ok(tz.to_string())
}
