use axum::{Router, routing::get};

pub mod accounts;
pub mod internal;
pub mod invites;
pub mod members;
pub mod organizations;
pub mod system;
pub mod vendor;

/// Router for everything under `/api`. Which paths need a tenant context is
/// decided by the middleware's path policy, not by how routes are grouped.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/health", system::router())
        .nest("/accounts", accounts::router())
        .nest("/organizations", organizations::router())
        .nest("/internal", internal::router())
        .nest("/vendor", vendor::router())
}
