//! `orggate-auth`: tenant-context tokens and role enforcement.
//!
//! This crate is decoupled from HTTP and storage.

pub mod claims;
pub mod context;
pub mod gate;
pub mod invite;
pub mod membership;
pub mod password;
pub mod roles;
pub mod secret;
pub mod token;
pub mod user;

pub use claims::{TenantClaims, validate_claims};
pub use context::{ContextSource, Identity, TenantContext};
pub use gate::{Access, DenialKind, GateDenial, PathClass, RoleRequirement, check, protect_last_admin};
pub use invite::{Invite, InviteStatus, InviteSummary};
pub use membership::Membership;
pub use password::{PasswordConfig, PasswordError, PasswordHasher};
pub use roles::{Role, UnknownRole};
pub use secret::{generate_secure_token, token_digest};
pub use token::{TokenCodec, TokenError};
pub use user::{User, UserStatus, UserSummary, normalize_email, username_base};
