//! Child-lookup capability over the tenant tree.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Tenant, TenantError, TenantId, TenantResult};

/// Read access to the tenant tree, provided by the storage layer.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Gets a tenant by ID.
    async fn get(&self, id: &TenantId) -> TenantResult<Option<Tenant>>;

    /// Lists the direct children of a tenant.
    async fn children(&self, id: &TenantId) -> TenantResult<Vec<Tenant>>;

    /// Lists the IDs of every known tenant.
    async fn all_tenant_ids(&self) -> TenantResult<Vec<TenantId>>;
}

/// In-memory tenant directory for tests and the CLI.
pub struct InMemoryTenantDirectory {
    tenants: Arc<RwLock<HashMap<TenantId, Tenant>>>,
}

impl Default for InMemoryTenantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTenantDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            tenants: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a directory pre-populated with tenants.
    ///
    /// Parents are not checked here; use [`insert`](Self::insert) for that.
    pub fn with_tenants(tenants: Vec<Tenant>) -> Self {
        let map: HashMap<TenantId, Tenant> =
            tenants.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            tenants: Arc::new(RwLock::new(map)),
        }
    }

    /// Inserts a tenant whose parent must already be present.
    pub async fn insert(&self, tenant: Tenant) -> TenantResult<()> {
        let mut tenants = self.tenants.write().await;

        if let Some(parent_id) = &tenant.parent_id {
            let parent = tenants
                .get(parent_id)
                .ok_or_else(|| TenantError::NotFound(parent_id.clone()))?;
            if parent.tenant_type.rank() <= tenant.tenant_type.rank() {
                return Err(TenantError::InvalidHierarchy(format!(
                    "{} '{}' cannot be parent of {} '{}'",
                    parent.tenant_type, parent.id, tenant.tenant_type, tenant.id
                )));
            }
        }

        tenants.insert(tenant.id.clone(), tenant);
        Ok(())
    }

    /// Gets a snapshot of all tenants in the directory.
    pub async fn snapshot(&self) -> Vec<Tenant> {
        self.tenants.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn get(&self, id: &TenantId) -> TenantResult<Option<Tenant>> {
        Ok(self.tenants.read().await.get(id).cloned())
    }

    async fn children(&self, id: &TenantId) -> TenantResult<Vec<Tenant>> {
        let tenants = self.tenants.read().await;
        let mut children: Vec<Tenant> = tenants
            .values()
            .filter(|t| t.parent_id.as_ref() == Some(id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(children)
    }

    async fn all_tenant_ids(&self) -> TenantResult<Vec<TenantId>> {
        let mut ids: Vec<TenantId> = self.tenants.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
