use chrono::Utc;
use tracing::warn;

use orggate_core::{OrgId, Organization, OrganizationStatus, UserId};

use crate::db::{StoreError, Tx};

/// Bounded attempts at generating a free organization identifier.
pub const MAX_ORG_ID_ATTEMPTS: usize = 3;

/// Already-validated organization attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub country: String,
    pub base_currency: String,
    pub timezone: String,
}

pub trait OrganizationStore {
    /// Insert under the organization's id; `Conflict` when the id is taken.
    fn insert_organization(&mut self, org: Organization) -> Result<(), StoreError>;

    fn organization(&self, id: &OrgId) -> Result<Option<Organization>, StoreError>;

    fn update_organization(&mut self, org: Organization) -> Result<(), StoreError>;

    /// Generate an identifier and insert, retrying on collision up to
    /// [`MAX_ORG_ID_ATTEMPTS`] times before giving up.
    fn create_organization(
        &mut self,
        new: NewOrganization,
        creator: UserId,
    ) -> Result<Organization, StoreError> {
        for attempt in 1..=MAX_ORG_ID_ATTEMPTS {
            let org = Organization {
                id: OrgId::generate(),
                name: new.name.clone(),
                country: new.country.clone(),
                base_currency: new.base_currency.clone(),
                timezone: new.timezone.clone(),
                status: OrganizationStatus::Active,
                created_by: creator,
                created_at: Utc::now(),
            };
            match self.insert_organization(org.clone()) {
                Ok(()) => return Ok(org),
                Err(StoreError::Conflict(_)) => {
                    warn!(attempt, "organization id collision; retrying");
                }
                Err(other) => return Err(other),
            }
        }
        Err(StoreError::Conflict(format!(
            "organization id still colliding after {MAX_ORG_ID_ATTEMPTS} attempts"
        )))
    }
}

impl OrganizationStore for Tx<'_> {
    fn insert_organization(&mut self, org: Organization) -> Result<(), StoreError> {
        if self.faults.take_org_id_collision() || self.tables.organizations.contains_key(&org.id) {
            return Err(StoreError::Conflict(format!("organization id {}", org.id)));
        }
        self.tables.organizations.insert(org.id.clone(), org);
        Ok(())
    }

    fn organization(&self, id: &OrgId) -> Result<Option<Organization>, StoreError> {
        Ok(self.tables.organizations.get(id).cloned())
    }

    fn update_organization(&mut self, org: Organization) -> Result<(), StoreError> {
        match self.tables.organizations.get_mut(&org.id) {
            Some(slot) => {
                *slot = org;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("organization {}", org.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryDatabase;

    fn draft() -> NewOrganization {
        NewOrganization {
            name: "Acme".to_string(),
            country: "US".to_string(),
            base_currency: "USD".to_string(),
            timezone: "UTC".to_string(),
        }
    }

    #[test]
    fn collisions_are_retried_within_bound() {
        let db = InMemoryDatabase::new();
        db.faults().force_org_id_collisions(MAX_ORG_ID_ATTEMPTS - 1);

        let org = db
            .transaction(|tx| tx.create_organization(draft(), UserId::new()))
            .unwrap();

        assert!(db.read(|tx| tx.organization(&org.id)).unwrap().is_some());
    }

    #[test]
    fn exhausted_retries_fail() {
        let db = InMemoryDatabase::new();
        db.faults().force_org_id_collisions(MAX_ORG_ID_ATTEMPTS);

        let result = db.transaction(|tx| tx.create_organization(draft(), UserId::new()));

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(db.snapshot().unwrap().organizations.is_empty());
    }
}
