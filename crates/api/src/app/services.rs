//! Service wiring: one database shared by every service.
//!
//! `from_config` picks the backends: Postgres when `USE_PERSISTENT_STORES`
//! is set (with `DATABASE_URL`), an SMTP relay when `SMTP_HOST` is set. The
//! in-memory store and the logging sender are the dev fallbacks.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use orggate_auth::{PasswordHasher, TokenCodec};
use orggate_core::CodePolicy;
use orggate_infra::services::{
    AccountService, InviteMail, InviteService, MemberService, OrganizationDefaults, OrganizationService,
};
use orggate_infra::{
    ContextResolver, Database, InMemorySessionStore, LoggingSender, NotificationError, NotificationSender,
    PgDatabase, PostgresSessionStore, SessionStore, SmtpSender, StoreError,
};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("database unavailable: {0}")]
    Database(#[from] StoreError),

    #[error("smtp relay misconfigured: {0}")]
    Smtp(#[from] NotificationError),
}

pub struct AppServices {
    pub config: AppConfig,
    pub db: Arc<Database>,
    pub resolver: ContextResolver,
    pub accounts: Arc<AccountService>,
    pub organizations: Arc<OrganizationService>,
    pub invites: Arc<InviteService>,
    pub members: Arc<MemberService>,
}

impl AppServices {
    /// Production wiring.
    pub async fn from_config(config: AppConfig) -> Result<Self, BootError> {
        let (db, sessions): (Database, Arc<dyn SessionStore>) = match &config.database {
            Some(pg) => {
                let pg_db = PgDatabase::connect(&pg.url, pg.max_connections).await?;
                let sessions = Arc::new(PostgresSessionStore::new(&pg_db, config.session_ttl));
                info!(max_connections = pg.max_connections, "using postgres stores");
                (Database::Postgres(pg_db), sessions)
            }
            None => {
                warn!("USE_PERSISTENT_STORES not set; all state is in memory and lost on restart");
                (
                    Database::in_memory(),
                    Arc::new(InMemorySessionStore::new(config.session_ttl)),
                )
            }
        };

        let notifier: Arc<dyn NotificationSender> = match &config.smtp {
            Some(smtp) => {
                info!(host = %smtp.host, port = smtp.port, "invite mail goes through smtp");
                Arc::new(SmtpSender::new(smtp)?)
            }
            None => {
                warn!("SMTP_HOST not set; invite mail is logged, not delivered");
                Arc::new(LoggingSender)
            }
        };

        Ok(Self::assemble(config, Arc::new(db), sessions, notifier))
    }

    /// In-memory wiring with a caller-supplied sender (tests).
    pub fn new(config: AppConfig, notifier: Arc<dyn NotificationSender>) -> Self {
        let sessions = Arc::new(InMemorySessionStore::new(config.session_ttl));
        Self::assemble(config, Arc::new(Database::in_memory()), sessions, notifier)
    }

    pub fn assemble(
        config: AppConfig,
        db: Arc<Database>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        let codec = TokenCodec::new(config.token_secret.as_bytes(), config.token_ttl);
        let resolver = ContextResolver::new(db.clone(), sessions.clone(), codec);
        let hasher = PasswordHasher::new(config.password);

        let accounts = AccountService::new(
            db.clone(),
            sessions,
            resolver.clone(),
            hasher.clone(),
            config.refresh_ttl,
        );
        let organizations = OrganizationService::new(
            db.clone(),
            CodePolicy::new(config.allowed_countries.clone(), config.allowed_currencies.clone()),
            OrganizationDefaults {
                base_currency: config.default_base_currency.clone(),
                timezone: config.default_timezone.clone(),
            },
        );
        let invites = InviteService::new(
            db.clone(),
            notifier,
            hasher,
            InviteMail {
                from: config.from_email.clone(),
                accept_url_base: config.invite_accept_url_base.clone(),
            },
        );

        Self {
            members: Arc::new(MemberService::new(db.clone())),
            accounts: Arc::new(accounts),
            organizations: Arc::new(organizations),
            invites: Arc::new(invites),
            resolver,
            db,
            config,
        }
    }
}
