//! In-memory implementation of InventoryRepository for tests and the CLI.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{DecisionUpdate, InventoryError, InventoryRepository, InventoryResult};
use super::{InventoryFilter, InventoryItem, InventorySummary};
use crate::pagination::{Page, Pagination};
use crate::tenant::TenantId;

/// In-memory inventory store.
#[derive(Clone, Default)]
pub struct InMemoryInventoryRepository {
    items: Arc<RwLock<HashMap<Uuid, InventoryItem>>>,
    /// Creates of items with this hostname fail.
    fail_hostname: Arc<RwLock<Option<String>>>,
}

impl InMemoryInventoryRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with items.
    pub fn with_items(items: Vec<InventoryItem>) -> Self {
        let map = items.into_iter().map(|item| (item.id, item)).collect();
        Self {
            items: Arc::new(RwLock::new(map)),
            fail_hostname: Arc::new(RwLock::new(None)),
        }
    }

    /// Makes every create for `hostname` fail with a storage error.
    pub async fn fail_creates_for(&self, hostname: &str) {
        *self.fail_hostname.write().await = Some(hostname.to_string());
    }

    /// Gets a snapshot of all stored items.
    pub async fn snapshot(&self) -> Vec<InventoryItem> {
        self.items.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.items.write().await.clear();
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn create(&self, item: &InventoryItem) -> InventoryResult<InventoryItem> {
        if let Some(ref failing) = *self.fail_hostname.read().await {
            if item.hostname.as_deref() == Some(failing.as_str()) {
                return Err(InventoryError::Storage(format!(
                    "write rejected for host '{}'",
                    failing
                )));
            }
        }

        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(InventoryError::Storage(format!(
                "inventory item {} already exists",
                item.id
            )));
        }
        items.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn get(&self, tenant_id: &TenantId, id: Uuid) -> InventoryResult<Option<InventoryItem>> {
        let items = self.items.read().await;
        Ok(items
            .get(&id)
            .filter(|item| &item.tenant_id == tenant_id)
            .cloned())
    }

    async fn update_decision(
        &self,
        tenant_id: &TenantId,
        id: Uuid,
        update: &DecisionUpdate,
    ) -> InventoryResult<InventoryItem> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&id)
            .filter(|item| &item.tenant_id == tenant_id)
            .ok_or(InventoryError::NotFound(id))?;

        item.status = update.status;
        item.inventory_comments = update.comments.clone();
        item.processed_by = update.processed_by;
        item.processed_at = update.processed_at;

        Ok(item.clone())
    }

    async fn list(
        &self,
        tenant_ids: &[TenantId],
        filter: &InventoryFilter,
        pagination: &Pagination,
    ) -> InventoryResult<Page<InventoryItem>> {
        let items = self.items.read().await;
        let mut matching: Vec<InventoryItem> = items
            .values()
            .filter(|item| tenant_ids.contains(&item.tenant_id))
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(pagination.apply(matching))
    }

    async fn summary(&self, tenant_ids: &[TenantId]) -> InventoryResult<InventorySummary> {
        let items = self.items.read().await;
        Ok(InventorySummary::from_items(
            items
                .values()
                .filter(|item| tenant_ids.contains(&item.tenant_id)),
        ))
    }
}
