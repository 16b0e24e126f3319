//! Role to permission-set mapping.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::{Permission, Role};

/// Immutable-after-startup mapping from role to its default permissions.
///
/// Built once from the defaults plus any configured overrides, then shared
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    roles: HashMap<Role, HashSet<Permission>>,
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionRegistry {
    /// Creates the registry with the built-in admin, analyst and viewer roles.
    pub fn new() -> Self {
        use Permission::*;

        let mut roles = HashMap::new();
        roles.insert(Role::Admin, Permission::ALL.iter().copied().collect());
        roles.insert(
            Role::Analyst,
            HashSet::from([
                AlertsRead,
                AlertsWrite,
                CasesRead,
                CasesWrite,
                AssetsRead,
                SensorsRead,
                InventoryRead,
                InventoryWrite,
                InventoryApprove,
                PlaybooksRead,
                PlaybooksExecute,
                UsersRead,
            ]),
        );
        roles.insert(
            Role::Viewer,
            HashSet::from([
                AlertsRead,
                CasesRead,
                AssetsRead,
                SensorsRead,
                InventoryRead,
                PlaybooksRead,
            ]),
        );

        Self { roles }
    }

    /// Adds a role or replaces a role's permission set.
    ///
    /// Admin keeps passing every check regardless of its stored set.
    pub fn set_role(&mut self, role: Role, permissions: HashSet<Permission>) {
        debug!(role = %role, count = permissions.len(), "Registering role permissions");
        self.roles.insert(role, permissions);
    }

    /// Builder form of [`set_role`](Self::set_role).
    pub fn with_role(mut self, role: Role, permissions: HashSet<Permission>) -> Self {
        self.set_role(role, permissions);
        self
    }

    /// Applies overrides given as permission strings.
    ///
    /// # Errors
    ///
    /// Returns the first string that is not in the catalog.
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        for (role, names) in overrides {
            let permissions = names
                .iter()
                .map(|name| name.parse::<Permission>())
                .collect::<Result<HashSet<_>, _>>()?;
            self.set_role(Role::from(role), permissions);
        }
        Ok(self)
    }

    /// Default permissions for `role`; empty for unknown roles.
    pub fn permissions_for(&self, role: &Role) -> HashSet<Permission> {
        self.roles.get(role).cloned().unwrap_or_default()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains_key(role)
    }

    /// Names of all registered roles, sorted.
    pub fn role_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roles.keys().map(|r| r.to_string()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles() {
        let registry = PermissionRegistry::new();

        assert_eq!(registry.permissions_for(&Role::Admin).len(), 33);
        let analyst = registry.permissions_for(&Role::Analyst);
        assert_eq!(analyst.len(), 12);
        assert!(analyst.contains(&Permission::InventoryApprove));
        assert!(!analyst.contains(&Permission::AlertsDelete));

        let viewer = registry.permissions_for(&Role::Viewer);
        assert_eq!(viewer.len(), 6);
        assert!(viewer.iter().all(|p| p.action() == "read"));
    }

    #[test]
    fn test_unknown_role_is_empty() {
        let registry = PermissionRegistry::new();
        assert!(registry
            .permissions_for(&Role::Custom("ghost".into()))
            .is_empty());
    }

    #[test]
    fn test_overrides() {
        let auditor = vec!["audit_logs:read".to_string(), "alerts:read".to_string()];
        let viewer = vec!["alerts:read".to_string()];
        let registry = PermissionRegistry::new()
            .with_overrides([("auditor", auditor.as_slice()), ("viewer", viewer.as_slice())])
            .unwrap();

        let role = Role::Custom("auditor".into());
        assert!(registry.has_role(&role));
        assert!(registry
            .permissions_for(&role)
            .contains(&Permission::AuditLogsRead));
        assert_eq!(registry.permissions_for(&Role::Viewer).len(), 1);
        assert_eq!(
            registry.role_names(),
            vec!["admin", "analyst", "auditor", "viewer"]
        );
    }

    #[test]
    fn test_override_with_unknown_permission_fails() {
        let bad = vec!["alerts:purge".to_string()];
        let err = PermissionRegistry::new()
            .with_overrides([("ops", bad.as_slice())])
            .unwrap_err();
        assert!(err.contains("alerts:purge"));
    }
}
