//! Tenant identifier and rank types.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use super::TenantError;

/// Opaque tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for TenantId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Position of a tenant in the hierarchy.
///
/// Ranks, highest first: root (4), provider (3), customer (2),
/// sub_customer (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    /// The platform operator. Sees every tenant.
    Root,
    /// A managed-service provider serving several customers.
    Provider,
    Customer,
    SubCustomer,
}

impl TenantType {
    /// Numeric rank; a higher rank sits closer to the root.
    pub fn rank(&self) -> u8 {
        match self {
            TenantType::Root => 4,
            TenantType::Provider => 3,
            TenantType::Customer => 2,
            TenantType::SubCustomer => 1,
        }
    }

    /// Returns true if this type ranks at or above `required`.
    pub fn is_at_least(&self, required: TenantType) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantType::Root => "root",
            TenantType::Provider => "provider",
            TenantType::Customer => "customer",
            TenantType::SubCustomer => "sub_customer",
        }
    }

    /// Returns all tenant types, highest rank first.
    pub fn all() -> [TenantType; 4] {
        [
            TenantType::Root,
            TenantType::Provider,
            TenantType::Customer,
            TenantType::SubCustomer,
        ]
    }
}

impl fmt::Display for TenantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantType {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "root" => Ok(TenantType::Root),
            "provider" => Ok(TenantType::Provider),
            "customer" => Ok(TenantType::Customer),
            "sub_customer" => Ok(TenantType::SubCustomer),
            other => Err(TenantError::InvalidTenantType(other.to_string())),
        }
    }
}
