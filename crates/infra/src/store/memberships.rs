use chrono::Utc;

use orggate_auth::{Membership, Role};
use orggate_core::{OrgId, UserId};

use crate::db::{StoreError, Tx};

/// Authoritative (user, organization) -> role mapping.
pub trait MembershipStore {
    /// Upsert: overwrites the role of an existing membership, otherwise
    /// creates one. Never produces a second row for the same pair.
    fn assign(&mut self, user: UserId, org: &OrgId, role: Role) -> Result<Membership, StoreError>;

    fn lookup(&self, user: UserId, org: &OrgId) -> Result<Option<Role>, StoreError>;

    fn membership(&self, user: UserId, org: &OrgId) -> Result<Option<Membership>, StoreError>;

    /// Stable order (by user id, which is time-ordered).
    fn list_for_org(&self, org: &OrgId) -> Result<Vec<Membership>, StoreError>;

    /// Most recently assigned first.
    fn list_for_user(&self, user: UserId) -> Result<Vec<Membership>, StoreError>;

    /// ORG_ADMIN memberships whose user is active. Inside a transaction the
    /// counted rows stay locked until it ends.
    fn count_active_admins(&self, org: &OrgId) -> Result<usize, StoreError>;
}

impl MembershipStore for Tx<'_> {
    fn assign(&mut self, user: UserId, org: &OrgId, role: Role) -> Result<Membership, StoreError> {
        if self.faults.take_membership_assign_failure() {
            return Err(StoreError::Injected("membership assign"));
        }
        let membership = self
            .tables
            .memberships
            .entry((org.clone(), user))
            .and_modify(|m| m.role = role)
            .or_insert_with(|| Membership {
                user_id: user,
                org_id: org.clone(),
                role,
                assigned_at: Utc::now(),
            });
        Ok(membership.clone())
    }

    fn lookup(&self, user: UserId, org: &OrgId) -> Result<Option<Role>, StoreError> {
        Ok(self
            .tables
            .memberships
            .get(&(org.clone(), user))
            .map(|m| m.role))
    }

    fn membership(&self, user: UserId, org: &OrgId) -> Result<Option<Membership>, StoreError> {
        Ok(self.tables.memberships.get(&(org.clone(), user)).cloned())
    }

    fn list_for_org(&self, org: &OrgId) -> Result<Vec<Membership>, StoreError> {
        Ok(self
            .tables
            .memberships
            .iter()
            .filter(|((o, _), _)| o == org)
            .map(|(_, m)| m.clone())
            .collect())
    }

    fn list_for_user(&self, user: UserId) -> Result<Vec<Membership>, StoreError> {
        let mut out: Vec<Membership> = self
            .tables
            .memberships
            .values()
            .filter(|m| m.user_id == user)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        Ok(out)
    }

    fn count_active_admins(&self, org: &OrgId) -> Result<usize, StoreError> {
        Ok(self
            .tables
            .memberships
            .iter()
            .filter(|((o, _), m)| o == org && m.role == Role::OrgAdmin)
            .filter(|((_, u), _)| self.tables.users.get(u).is_some_and(|user| user.is_active()))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::InMemoryDatabase;
    use crate::store::{NewUser, UserDirectory};

    fn seed_user(db: &InMemoryDatabase, name: &str) -> UserId {
        db.transaction(|tx| {
            tx.create_user(NewUser::new(name, &format!("{name}@example.com"), "hash"))
                .map(|u| u.id)
        })
        .unwrap()
    }

    #[test]
    fn assigning_twice_keeps_one_row_with_the_second_role() {
        let db = InMemoryDatabase::new();
        let org = OrgId::generate();
        let user = seed_user(&db, "alice");

        db.transaction(|tx| tx.assign(user, &org, Role::Viewer)).unwrap();
        let second = db.transaction(|tx| tx.assign(user, &org, Role::Finance)).unwrap();

        assert_eq!(second.role, Role::Finance);
        let rows = db.read(|tx| tx.list_for_org(&org)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, Role::Finance);
        assert_eq!(db.read(|tx| tx.lookup(user, &org)).unwrap(), Some(Role::Finance));
    }

    #[test]
    fn concurrent_assigns_never_duplicate() {
        let db = Arc::new(InMemoryDatabase::new());
        let org = OrgId::generate();
        let user = seed_user(&db, "bob");

        let handles: Vec<_> = Role::ALL
            .into_iter()
            .cycle()
            .take(32)
            .map(|role| {
                let db = Arc::clone(&db);
                let org = org.clone();
                std::thread::spawn(move || db.transaction(|tx| tx.assign(user, &org, role)).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(db.read(|tx| tx.list_for_org(&org)).unwrap().len(), 1);
    }

    #[test]
    fn active_admin_count_ignores_inactive_users_and_other_roles() {
        let db = InMemoryDatabase::new();
        let org = OrgId::generate();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");
        let c = seed_user(&db, "c");

        db.transaction(|tx| {
            tx.assign(a, &org, Role::OrgAdmin)?;
            tx.assign(b, &org, Role::OrgAdmin)?;
            tx.assign(c, &org, Role::Finance)?;
            tx.set_active(b, false)
        })
        .unwrap();

        assert_eq!(db.read(|tx| tx.count_active_admins(&org)).unwrap(), 1);
    }

    #[test]
    fn memberships_are_scoped_per_org() {
        let db = InMemoryDatabase::new();
        let org_a = OrgId::generate();
        let org_b = OrgId::generate();
        let user = seed_user(&db, "carol");

        db.transaction(|tx| tx.assign(user, &org_a, Role::Approver)).unwrap();

        assert_eq!(db.read(|tx| tx.lookup(user, &org_b)).unwrap(), None);
        assert_eq!(db.read(|tx| tx.list_for_user(user)).unwrap().len(), 1);
    }
}
