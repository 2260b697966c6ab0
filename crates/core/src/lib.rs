//! `orggate-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod organization;

pub use error::{DomainError, DomainResult};
pub use id::{InviteId, OrgId, UserId};
pub use organization::{CodePolicy, Organization, OrganizationStatus, SettingsPatch, normalize_code};
