//! Infrastructure layer: storage, sessions, notifications, context
//! resolution and the services built on them.

pub mod db;
pub mod notifications;
pub mod resolver;
pub mod services;
pub mod sessions;
pub mod store;

pub use db::{Database, FaultPlan, InMemoryDatabase, PgDatabase, StoreError, Tx};
pub use notifications::{
    DeliveryReceipt, LoggingSender, Notification, NotificationError, NotificationSender, RecordingOutbox,
    SmtpConfig, SmtpSender,
};
pub use resolver::{ContextError, ContextResolver, Credentials, LoginError, UnauthenticatedReason};
pub use sessions::{InMemorySessionStore, PostgresSessionStore, Session, SessionStore};
