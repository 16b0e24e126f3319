//! Authorization types for UnderSight.
//!
//! This module provides:
//! - The closed `Permission` catalog in `<resource>:<action>` form
//! - `Role` definitions, including deployment-defined custom roles
//! - `Principal`, the verified caller of a request
//! - `PermissionRegistry`, the role to permission-set mapping
//! - The access checks in [`access`]

pub mod access;
mod principal;
mod registry;

pub use access::{
    can_access_resource, require_all_permissions, require_any_permission, require_permission,
    require_resource_tenant, require_tenant_level, AccessError, Requirement,
};
pub use principal::{Principal, PrincipalClaims, PrincipalError};
pub use registry::PermissionRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! permissions {
    ($($variant:ident => $name:literal,)+) => {
        /// A single `<resource>:<action>` permission.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Permission {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Permission {
            /// Every permission in the catalog.
            pub const ALL: &'static [Permission] = &[$(Permission::$variant,)+];

            /// Returns the canonical string form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Permission::$variant => $name,)+
                }
            }
        }

        impl FromStr for Permission {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Permission::$variant),)+
                    other => Err(format!("unknown permission '{}'", other)),
                }
            }
        }
    };
}

permissions! {
    AlertsRead => "alerts:read",
    AlertsWrite => "alerts:write",
    AlertsDelete => "alerts:delete",
    CasesRead => "cases:read",
    CasesWrite => "cases:write",
    CasesDelete => "cases:delete",
    CasesManage => "cases:manage",
    AssetsRead => "assets:read",
    AssetsWrite => "assets:write",
    AssetsDelete => "assets:delete",
    SensorsRead => "sensors:read",
    SensorsWrite => "sensors:write",
    SensorsDelete => "sensors:delete",
    InventoryRead => "inventory:read",
    InventoryWrite => "inventory:write",
    InventoryDelete => "inventory:delete",
    InventoryApprove => "inventory:approve",
    PlaybooksRead => "playbooks:read",
    PlaybooksWrite => "playbooks:write",
    PlaybooksExecute => "playbooks:execute",
    UsersRead => "users:read",
    UsersWrite => "users:write",
    RolesRead => "roles:read",
    RolesWrite => "roles:write",
    SettingsRead => "settings:read",
    SettingsWrite => "settings:write",
    IntegrationsRead => "integrations:read",
    IntegrationsWrite => "integrations:write",
    WebhooksRead => "webhooks:read",
    WebhooksWrite => "webhooks:write",
    ApiKeysRead => "api_keys:read",
    ApiKeysWrite => "api_keys:write",
    AuditLogsRead => "audit_logs:read",
}

impl Permission {
    /// The resource part, e.g. `alerts`.
    pub fn resource(&self) -> &'static str {
        self.as_str().split_once(':').map(|(r, _)| r).unwrap_or("")
    }

    /// The action part, e.g. `read`.
    pub fn action(&self) -> &'static str {
        self.as_str().split_once(':').map(|(_, a)| a).unwrap_or("")
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User role for role-based access control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Passes every permission check.
    Admin,
    /// Works alerts, cases and inventory.
    Analyst,
    /// Read-only access.
    #[default]
    Viewer,
    /// A role defined in deployment configuration.
    Custom(String),
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Analyst => "analyst",
            Role::Viewer => "viewer",
            Role::Custom(name) => name,
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Role::Admin,
            "analyst" => Role::Analyst,
            "viewer" => Role::Viewer,
            _ => Role::Custom(s.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::from(s.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}
