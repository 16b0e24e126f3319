//! The authenticated caller of a request.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use super::{Permission, PermissionRegistry, Role};
use crate::tenant::{TenantContext, TenantId, TenantType};

/// Errors raised while turning token claims into a principal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("Missing claim: {0}")]
    MissingClaim(&'static str),

    #[error("Invalid tenant type: {0}")]
    InvalidTenantType(String),

    #[error("Invalid permission: {0}")]
    InvalidPermission(String),
}

/// Claims as they arrive from a verified token.
///
/// Token signature checks happen upstream; this type only carries the
/// already-verified payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrincipalClaims {
    #[serde(alias = "sub")]
    pub user_id: String,
    pub tenant_id: String,
    pub tenant_type: String,
    #[serde(default)]
    pub role: String,
    /// Explicit per-user permissions. Absent means the role defaults apply.
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// A verified caller, built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub tenant_id: TenantId,
    pub tenant_type: TenantType,
    pub role: Role,
    /// Effective permission set.
    pub permissions: HashSet<Permission>,
}

impl Principal {
    /// Creates a principal whose permissions are the role defaults.
    pub fn from_role(
        id: impl Into<String>,
        tenant_id: impl Into<TenantId>,
        tenant_type: TenantType,
        role: Role,
        registry: &PermissionRegistry,
    ) -> Self {
        let permissions = registry.permissions_for(&role);
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            tenant_type,
            role,
            permissions,
        }
    }

    /// Replaces the effective permissions with an explicit set.
    pub fn with_permissions(mut self, permissions: HashSet<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Validates verified claims and builds the principal.
    ///
    /// # Errors
    ///
    /// Rejects empty IDs, unknown tenant types and permission strings outside
    /// the catalog.
    pub fn try_from_claims(
        claims: &PrincipalClaims,
        registry: &PermissionRegistry,
    ) -> Result<Self, PrincipalError> {
        if claims.user_id.trim().is_empty() {
            return Err(PrincipalError::MissingClaim("user_id"));
        }
        if claims.tenant_id.trim().is_empty() {
            return Err(PrincipalError::MissingClaim("tenant_id"));
        }
        let tenant_type: TenantType = claims
            .tenant_type
            .parse()
            .map_err(|_| PrincipalError::InvalidTenantType(claims.tenant_type.clone()))?;

        let role = if claims.role.trim().is_empty() {
            Role::Viewer
        } else {
            Role::from(claims.role.as_str())
        };

        let principal = Self::from_role(
            claims.user_id.clone(),
            claims.tenant_id.clone(),
            tenant_type,
            role,
            registry,
        );

        match &claims.permissions {
            None => Ok(principal),
            Some(names) => {
                let permissions = names
                    .iter()
                    .map(|name| {
                        name.parse::<Permission>()
                            .map_err(|_| PrincipalError::InvalidPermission(name.clone()))
                    })
                    .collect::<Result<HashSet<_>, _>>()?;
                Ok(principal.with_permissions(permissions))
            }
        }
    }

    /// Root-tenant principals are super admins.
    pub fn is_super_admin(&self) -> bool {
        self.tenant_type == TenantType::Root
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.is_admin() || self.permissions.contains(&permission)
    }

    /// The tenant context this principal acts in.
    pub fn tenant_context(&self) -> TenantContext {
        TenantContext::new(self.tenant_id.clone(), self.tenant_type)
    }

    /// Returns the actor identity string for audit logging.
    pub fn audit_identity(&self) -> String {
        format!("{}@{}", self.id, self.tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(tenant_type: &str, role: &str) -> PrincipalClaims {
        PrincipalClaims {
            user_id: "u1".into(),
            tenant_id: "t1".into(),
            tenant_type: tenant_type.into(),
            role: role.into(),
            permissions: None,
        }
    }

    #[test]
    fn test_from_claims_uses_role_defaults() {
        let registry = PermissionRegistry::new();
        let analyst = claims("customer", "analyst");
        let principal = Principal::try_from_claims(&analyst, &registry).unwrap();

        assert_eq!(principal.role, Role::Analyst);
        assert_eq!(principal.tenant_type, TenantType::Customer);
        assert!(principal.has_permission(Permission::InventoryApprove));
        assert!(!principal.is_super_admin());
        assert_eq!(principal.audit_identity(), "u1@t1");
    }

    #[test]
    fn test_explicit_permissions_override_role() {
        let registry = PermissionRegistry::new();
        let mut c = claims("provider", "viewer");
        c.permissions = Some(vec!["alerts:delete".into()]);

        let principal = Principal::try_from_claims(&c, &registry).unwrap();
        assert!(principal.has_permission(Permission::AlertsDelete));
        assert!(!principal.has_permission(Permission::AlertsRead));
    }

    #[test]
    fn test_invalid_claims_rejected() {
        let registry = PermissionRegistry::new();

        assert_eq!(
            Principal::try_from_claims(&claims("galaxy", "admin"), &registry),
            Err(PrincipalError::InvalidTenantType("galaxy".into()))
        );

        let mut c = claims("root", "admin");
        c.permissions = Some(vec!["alerts:nuke".into()]);
        assert_eq!(
            Principal::try_from_claims(&c, &registry),
            Err(PrincipalError::InvalidPermission("alerts:nuke".into()))
        );

        let mut c = claims("root", "admin");
        c.tenant_id = String::new();
        assert_eq!(
            Principal::try_from_claims(&c, &registry),
            Err(PrincipalError::MissingClaim("tenant_id"))
        );
    }

    #[test]
    fn test_claims_from_json() {
        let json = r#"{"sub": "u9", "tenant_id": "r", "tenant_type": "root", "role": "admin"}"#;
        let c: PrincipalClaims = serde_json::from_str(json).unwrap();
        let principal = Principal::try_from_claims(&c, &PermissionRegistry::new()).unwrap();

        assert!(principal.is_super_admin());
        assert_eq!(principal.tenant_context().tenant_id.as_str(), "r");
    }

    #[test]
    fn test_admin_passes_without_stored_permission() {
        let principal = Principal::from_role(
            "u1",
            "t1",
            TenantType::Customer,
            Role::Admin,
            &PermissionRegistry::new(),
        )
        .with_permissions(HashSet::new());
        assert!(principal.has_permission(Permission::AuditLogsRead));
    }
}
