use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role held by a user inside one organization.
///
/// The set is closed: capabilities are declared per endpoint against these
/// variants and every gate decision matches on them exhaustively.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    OrgAdmin,
    Finance,
    Approver,
    Viewer,
    Vendor,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::OrgAdmin,
        Role::Finance,
        Role::Approver,
        Role::Viewer,
        Role::Vendor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::OrgAdmin => "ORG_ADMIN",
            Role::Finance => "FINANCE",
            Role::Approver => "APPROVER",
            Role::Viewer => "VIEWER",
            Role::Vendor => "VENDOR",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::OrgAdmin => "Organization Admin",
            Role::Finance => "Finance",
            Role::Approver => "Approver",
            Role::Viewer => "Viewer",
            Role::Vendor => "Vendor",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_their_wire_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }

    #[test]
    fn role_parse_is_case_insensitive_but_closed() {
        assert_eq!("org_admin".parse::<Role>().unwrap(), Role::OrgAdmin);
        assert_eq!("UNKNOWN".parse::<Role>(), Err(UnknownRole("UNKNOWN".to_string())));
    }
}
