//! Transactional in-memory database.
//!
//! All tables live behind one mutex. A transaction works on a copy of the
//! tables and swaps it in only when the closure returns `Ok`, so every
//! transaction is atomic and transactions are serialized against each other.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use orggate_auth::{Invite, Membership, User};
use orggate_core::{InviteId, OrgId, Organization, UserId};

use super::StoreError;
use crate::store::{RefreshRecord, StoreTx};

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub users: BTreeMap<UserId, User>,
    pub organizations: BTreeMap<OrgId, Organization>,
    /// Keyed by (org, user): the key itself is the uniqueness constraint.
    pub memberships: BTreeMap<(OrgId, UserId), Membership>,
    pub invites: BTreeMap<InviteId, Invite>,
    /// Keyed by the SHA-256 digest of the refresh token.
    pub refresh_tokens: BTreeMap<String, RefreshRecord>,
}

/// Failure injection for atomicity tests.
#[derive(Debug, Default)]
pub struct FaultPlan {
    membership_assign_failures: AtomicUsize,
    org_id_collisions: AtomicUsize,
}

impl FaultPlan {
    /// Make the next `n` membership assignments fail.
    pub fn fail_membership_assigns(&self, n: usize) {
        self.membership_assign_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` organization inserts report an identifier collision.
    pub fn force_org_id_collisions(&self, n: usize) {
        self.org_id_collisions.store(n, Ordering::SeqCst);
    }

    pub(crate) fn take_membership_assign_failure(&self) -> bool {
        take(&self.membership_assign_failures)
    }

    pub(crate) fn take_org_id_collision(&self) -> bool {
        take(&self.org_id_collisions)
    }
}

fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Handle passed to transaction and read closures. The store traits in
/// [`crate::store`] are implemented on it.
pub struct Tx<'a> {
    pub(crate) tables: &'a mut Tables,
    pub(crate) faults: &'a FaultPlan,
}

#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    faults: FaultPlan,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        let mut working = guard.clone();
        let mut tx = Tx {
            tables: &mut working,
            faults: &self.faults,
        };
        let out = f(&mut tx)?;
        *guard = working;
        Ok(out)
    }

    /// Run a read-only closure against the committed state.
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = Tx {
            tables: &mut *guard,
            faults: &self.faults,
        };
        f(&tx)
    }

    /// Copy of the committed tables.
    pub fn snapshot(&self) -> Result<Tables, StoreError> {
        self.tables
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| StoreError::Poisoned)
    }
}

#[cfg(test)]
mod tests {
    use orggate_auth::Role;

    use super::*;
    use crate::store::MembershipStore;

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let db = InMemoryDatabase::new();
        let org = OrgId::generate();
        let user = UserId::new();

        let result: Result<(), StoreError> = db.transaction(|tx| {
            tx.assign(user, &org, Role::Viewer)?;
            Err(StoreError::Injected("abort"))
        });

        assert!(result.is_err());
        assert!(db.snapshot().unwrap().memberships.is_empty());
    }

    #[test]
    fn fault_counters_drain() {
        let faults = FaultPlan::default();
        faults.force_org_id_collisions(2);
        assert!(faults.take_org_id_collision());
        assert!(faults.take_org_id_collision());
        assert!(!faults.take_org_id_collision());
    }
}
