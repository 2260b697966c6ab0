//! Storage backends behind one transactional API.
//!
//! Services run their read-check-write sequences as closures over a
//! [`StoreTx`]. The in-memory backend serializes transactions behind a mutex
//! and is what tests run against; the Postgres backend maps each closure onto
//! one SQL transaction and relies on unique indexes and row locks.

mod memory;
mod postgres;

pub use memory::{FaultPlan, InMemoryDatabase, Tables, Tx};
pub use postgres::{PgDatabase, PgTx};
pub(crate) use postgres::block_on;

use crate::store::StoreTx;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("database error: {0}")]
    Backend(String),

    #[error("undecodable row: {0}")]
    Decode(String),

    #[error("injected fault: {0}")]
    Injected(&'static str),
}

/// The configured storage backend.
#[derive(Debug)]
pub enum Database {
    InMemory(InMemoryDatabase),
    Postgres(PgDatabase),
}

impl Database {
    pub fn in_memory() -> Self {
        Database::InMemory(InMemoryDatabase::new())
    }

    /// Run `f` atomically. Nothing it wrote is visible if it returns `Err`.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        match self {
            Database::InMemory(db) => db.transaction(f),
            Database::Postgres(db) => db.transaction(f),
        }
    }

    /// Run a closure that only reads.
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        match self {
            Database::InMemory(db) => db.read(f),
            Database::Postgres(db) => db.read(f),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Database::InMemory(_) => "in-memory",
            Database::Postgres(_) => "postgres",
        }
    }
}
