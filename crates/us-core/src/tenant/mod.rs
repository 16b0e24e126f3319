//! Multi-tenant support for UnderSight.
//!
//! This module provides the tenant hierarchy primitives:
//! - `Tenant`: a node in the root > provider > customer > sub_customer tree
//! - `TenantContext`: lightweight request-scoped tenant context
//! - `hierarchy`: the reachability rules between tenants
//! - `scope`: the task-local holder for the active tenant of a request
//!
//! # Example
//!
//! ```rust
//! use us_core::tenant::{Tenant, TenantContext, TenantType};
//!
//! let root = Tenant::root("r", "Platform");
//! let msp = Tenant::new("p1", "Acme MSP", TenantType::Provider, Some(&root)).unwrap();
//!
//! let ctx = TenantContext::from_tenant(&msp);
//! assert_eq!(ctx.tenant_type, TenantType::Provider);
//! assert!(!ctx.is_super_admin());
//! ```

mod directory;
pub mod hierarchy;
pub mod scope;
mod types;

pub use directory::{InMemoryTenantDirectory, TenantDirectory};
pub use hierarchy::{accessible_tenant_ids, can_access, can_access_with_lineage};
pub use scope::RequestTenant;
pub use types::{TenantId, TenantType};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during tenant operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantError {
    /// Unknown tenant type string.
    #[error("Invalid tenant type: {0}")]
    InvalidTenantType(String),

    /// Tenant not found.
    #[error("Tenant not found: {0}")]
    NotFound(TenantId),

    /// The parent/child relation breaks the rank ordering.
    #[error("Invalid tenant hierarchy: {0}")]
    InvalidHierarchy(String),

    /// The tenant context was written outside a request scope.
    #[error("No active request scope for tenant context")]
    NoActiveScope,

    /// The child-lookup collaborator failed.
    #[error("Tenant directory error: {0}")]
    Directory(String),
}

/// Result type for tenant operations.
pub type TenantResult<T> = Result<T, TenantError>;

/// A node in the tenant hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique identifier for this tenant.
    pub id: TenantId,

    /// Display name of the tenant/organization.
    pub name: String,

    pub tenant_type: TenantType,

    /// Absent only for the root.
    pub parent_id: Option<TenantId>,
}

impl Tenant {
    /// Creates the root tenant.
    pub fn root(id: impl Into<TenantId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            tenant_type: TenantType::Root,
            parent_id: None,
        }
    }

    /// Creates a non-root tenant under `parent`.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::InvalidHierarchy` if the tenant type is root, the
    /// parent is missing, or the parent does not rank strictly higher.
    pub fn new(
        id: impl Into<TenantId>,
        name: &str,
        tenant_type: TenantType,
        parent: Option<&Tenant>,
    ) -> TenantResult<Self> {
        let id = id.into();
        if tenant_type == TenantType::Root {
            return Err(TenantError::InvalidHierarchy(
                "use Tenant::root for the root tenant".to_string(),
            ));
        }
        let parent = parent.ok_or_else(|| {
            TenantError::InvalidHierarchy(format!("tenant '{}' requires a parent", id))
        })?;
        if parent.tenant_type.rank() <= tenant_type.rank() {
            return Err(TenantError::InvalidHierarchy(format!(
                "{} '{}' cannot be parent of {} '{}'",
                parent.tenant_type, parent.id, tenant_type, id
            )));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            tenant_type,
            parent_id: Some(parent.id.clone()),
        })
    }

    pub fn is_root(&self) -> bool {
        self.tenant_type == TenantType::Root
    }
}

/// Request-scoped tenant context.
///
/// A small value passed through service calls. The per-request holder that
/// middleware writes into lives in [`scope::RequestTenant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// The tenant's identifier.
    pub tenant_id: TenantId,

    pub tenant_type: TenantType,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<TenantId>, tenant_type: TenantType) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tenant_type,
        }
    }

    /// Creates a new tenant context from a tenant entity.
    pub fn from_tenant(tenant: &Tenant) -> Self {
        Self::new(tenant.id.clone(), tenant.tenant_type)
    }

    /// Root tenants act as super admins.
    pub fn is_super_admin(&self) -> bool {
        self.tenant_type == TenantType::Root
    }
}
