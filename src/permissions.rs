use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Membership role within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(Error::InvalidRole(other.to_owned())),
        }
    }
}

/// Capabilities derived from a [`Role`].
///
/// Never stored: always recomputed with [`Permissions::for_role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Permissions {
    pub can_edit_organization: bool,
    pub can_manage_members: bool,
    pub can_manage_billing: bool,
    pub can_delete_organization: bool,
    pub can_view_advanced_settings: bool,
}

impl Permissions {
    /// The empty capability set, used when there is no session or no organization.
    pub const NONE: Self = Self {
        can_edit_organization: false,
        can_manage_members: false,
        can_manage_billing: false,
        can_delete_organization: false,
        can_view_advanced_settings: false,
    };

    /// Fixed role table. Billing and deletion are owner-only.
    #[must_use]
    pub const fn for_role(role: Option<Role>) -> Self {
        match role {
            Some(Role::Owner) => Self {
                can_edit_organization: true,
                can_manage_members: true,
                can_manage_billing: true,
                can_delete_organization: true,
                can_view_advanced_settings: true,
            },
            Some(Role::Admin) => Self {
                can_edit_organization: true,
                can_manage_members: true,
                can_manage_billing: false,
                can_delete_organization: false,
                can_view_advanced_settings: true,
            },
            Some(Role::Member) | None => Self::NONE,
        }
    }

    /// True if every capability in `other` is also granted here.
    #[must_use]
    pub fn includes(&self, other: &Self) -> bool {
        (!other.can_edit_organization || self.can_edit_organization)
            && (!other.can_manage_members || self.can_manage_members)
            && (!other.can_manage_billing || self.can_manage_billing)
            && (!other.can_delete_organization || self.can_delete_organization)
            && (!other.can_view_advanced_settings || self.can_view_advanced_settings)
    }
}
