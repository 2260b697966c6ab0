//! HTTP API: configuration, tenant-context middleware, role gate and routes.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
