//! Store seams.
//!
//! Each trait is implemented on the in-memory [`crate::db::Tx`] and on the
//! Postgres [`crate::db::PgTx`]. Callers reach them through
//! `Database::transaction` (writes) or `Database::read` as a `dyn StoreTx`.

mod invites;
mod memberships;
mod organizations;
mod refresh_tokens;
mod users;

pub use invites::InviteStore;
pub use memberships::MembershipStore;
pub use organizations::{MAX_ORG_ID_ATTEMPTS, NewOrganization, OrganizationStore};
pub use refresh_tokens::{RefreshRecord, RefreshTokenLedger};
pub use users::{NewUser, UserDirectory};

/// Every store seam at once: what a transaction closure receives.
pub trait StoreTx: MembershipStore + UserDirectory + OrganizationStore + InviteStore + RefreshTokenLedger {}

impl<T> StoreTx for T where T: MembershipStore + UserDirectory + OrganizationStore + InviteStore + RefreshTokenLedger {}
