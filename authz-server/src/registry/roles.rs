//! Built-in roles and their permission sets.

use crate::registry::{Permission, PermissionRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a role a subject can be bound to.
///
/// The three default roles are seeded for every program; `Custom` covers
/// roles created by operators at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleName {
    DefaultAdmin,
    DefaultClient,
    DefaultCaregiver,
    Custom(String),
}

impl RoleName {
    pub fn as_str(&self) -> &str {
        match self {
            RoleName::DefaultAdmin => "Default Admin",
            RoleName::DefaultClient => "Default Client",
            RoleName::DefaultCaregiver => "Default Caregiver",
            RoleName::Custom(name) => name,
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Default Admin" => RoleName::DefaultAdmin,
            "Default Client" => RoleName::DefaultClient,
            "Default Caregiver" => RoleName::DefaultCaregiver,
            _ => RoleName::Custom(value),
        }
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.as_str().to_string()
    }
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub name: RoleName,
    pub permissions: Vec<Permission>,
}

/// The roles every new program is seeded with.
///
/// The admin role carries the entire catalog; client and caregiver carry
/// their curated subsets.
pub fn default_roles(registry: &PermissionRegistry) -> Vec<Role> {
    vec![
        Role {
            name: RoleName::DefaultAdmin,
            permissions: registry.all().to_vec(),
        },
        Role {
            name: RoleName::DefaultClient,
            permissions: registry.default_client().to_vec(),
        },
        Role {
            name: RoleName::DefaultCaregiver,
            permissions: registry.default_caregiver().to_vec(),
        },
    ]
}
