//! Access decisions for a principal.
//!
//! Every `require_*` check returns `Ok(())` or an [`AccessError`]. Denials
//! name the requirement that failed and nothing about the caller's role.

use std::fmt;
use thiserror::Error;
use tracing::warn;
use us_observability::MetricsCollector;

use super::{Permission, Principal};
use crate::tenant::{TenantId, TenantType};

/// What a denied check required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Permission(Permission),
    AnyOf(Vec<Permission>),
    AllOf(Vec<Permission>),
    TenantLevel(TenantType),
    Tenant(TenantId),
}

impl Requirement {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Requirement::Permission(_) => "permission",
            Requirement::AnyOf(_) => "any_of",
            Requirement::AllOf(_) => "all_of",
            Requirement::TenantLevel(_) => "tenant_level",
            Requirement::Tenant(_) => "tenant",
        }
    }
}

fn join(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Permission(p) => write!(f, "{} required", p),
            Requirement::AnyOf(ps) => write!(f, "one of [{}] required", join(ps)),
            Requirement::AllOf(ps) => write!(f, "all of [{}] required", join(ps)),
            Requirement::TenantLevel(t) => write!(f, "tenant level '{}' or higher required", t),
            Requirement::Tenant(id) => write!(f, "access to tenant '{}' required", id),
        }
    }
}

/// Errors returned by access checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Permission denied: {0}")]
    Forbidden(Requirement),
}

impl AccessError {
    /// The failed requirement, if the caller was authenticated.
    pub fn requirement(&self) -> Option<&Requirement> {
        match self {
            AccessError::Unauthenticated => None,
            AccessError::Forbidden(req) => Some(req),
        }
    }
}

fn authenticated(principal: Option<&Principal>) -> Result<&Principal, AccessError> {
    principal.ok_or_else(|| {
        warn!("Access check without an authenticated principal");
        MetricsCollector::record_access_denied("unauthenticated");
        AccessError::Unauthenticated
    })
}

fn deny(principal: &Principal, requirement: Requirement) -> AccessError {
    warn!(
        principal_id = %principal.id,
        tenant_id = %principal.tenant_id,
        requirement = %requirement,
        "Access denied"
    );
    MetricsCollector::record_access_denied(requirement.kind());
    AccessError::Forbidden(requirement)
}

/// Requires a single permission. Admin always passes.
pub fn require_permission(
    principal: Option<&Principal>,
    permission: Permission,
) -> Result<(), AccessError> {
    let principal = authenticated(principal)?;
    if principal.has_permission(permission) {
        Ok(())
    } else {
        Err(deny(principal, Requirement::Permission(permission)))
    }
}

/// Requires at least one of `permissions`. Admin always passes.
pub fn require_any_permission(
    principal: Option<&Principal>,
    permissions: &[Permission],
) -> Result<(), AccessError> {
    let principal = authenticated(principal)?;
    if principal.role.is_admin() || permissions.iter().any(|p| principal.permissions.contains(p))
    {
        Ok(())
    } else {
        Err(deny(principal, Requirement::AnyOf(permissions.to_vec())))
    }
}

/// Requires every one of `permissions`. Admin always passes.
pub fn require_all_permissions(
    principal: Option<&Principal>,
    permissions: &[Permission],
) -> Result<(), AccessError> {
    let principal = authenticated(principal)?;
    if principal.role.is_admin() || permissions.iter().all(|p| principal.permissions.contains(p))
    {
        Ok(())
    } else {
        Err(deny(principal, Requirement::AllOf(permissions.to_vec())))
    }
}

/// Requires the principal's tenant to rank at least `required`.
pub fn require_tenant_level(
    principal: Option<&Principal>,
    required: TenantType,
) -> Result<(), AccessError> {
    let principal = authenticated(principal)?;
    if principal.tenant_type.is_at_least(required) {
        Ok(())
    } else {
        Err(deny(principal, Requirement::TenantLevel(required)))
    }
}

/// Requires the resource to belong to the principal's tenant.
///
/// Only root principals may cross tenants.
pub fn require_resource_tenant(
    principal: Option<&Principal>,
    resource_tenant_id: &TenantId,
) -> Result<(), AccessError> {
    let principal = authenticated(principal)?;
    if principal.is_super_admin() || &principal.tenant_id == resource_tenant_id {
        Ok(())
    } else {
        Err(deny(principal, Requirement::Tenant(resource_tenant_id.clone())))
    }
}

/// Combined tenant and permission check for one resource.
///
/// Super admin passes, a different tenant fails, admin passes, otherwise the
/// permission must be held.
pub fn can_access_resource(
    principal: &Principal,
    resource_tenant_id: &TenantId,
    permission: Permission,
) -> bool {
    if principal.is_super_admin() {
        return true;
    }
    if &principal.tenant_id != resource_tenant_id {
        return false;
    }
    principal.has_permission(permission)
}
