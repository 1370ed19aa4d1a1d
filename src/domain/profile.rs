//! Business profile record associated with an identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dashboard role of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Manager,
    Employee,
    /// A role value this build does not know about.
    Unknown(String),
}

impl Role {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "owner" => Role::Admin,
            "manager" => Role::Manager,
            "employee" | "staff" => Role::Employee,
            _ => Role::Unknown(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
            Role::Unknown(value) => value,
        }
    }

    /// Whether the role may edit schedules, teams and locations.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user record from the backend.
///
/// Only the fields consumers branch on are typed; every other column is kept
/// in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, alias = "full_name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    pub fn role_kind(&self) -> Option<Role> {
        self.role.as_deref().map(Role::parse)
    }

    /// Whether the profile has been attached to an organization yet.
    pub fn has_organization(&self) -> bool {
        self.organization_id
            .as_deref()
            .is_some_and(|org| !org.is_empty())
    }
}
