//! Orchestration over the stores: one service per lifecycle.

pub mod accounts;
pub mod invites;
pub mod members;
pub mod organizations;

pub use accounts::{AccountError, AccountService, LoginOutcome, RefreshOutcome, Registration};
pub use invites::{AcceptedInvite, InviteError, InviteMail, InviteService};
pub use members::{MemberError, MemberService, MemberView};
pub use organizations::{
    CreateOrganization, OrganizationDefaults, OrganizationError, OrganizationService,
};
