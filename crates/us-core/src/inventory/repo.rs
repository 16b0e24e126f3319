//! Inventory repository trait and error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{InventoryFilter, InventoryItem, InventoryStatus, InventorySummary, ProcessedBy};
use crate::auth::AccessError;
use crate::pagination::{Page, Pagination};
use crate::tenant::{TenantError, TenantId};

/// Errors that can occur during inventory operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InventoryError {
    /// Item not found in the caller's tenant.
    #[error("Inventory item not found: {0}")]
    NotFound(Uuid),

    /// The record store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The webhook body could not be read as equipment records.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Tenant(#[from] TenantError),
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Fields overwritten by a manual decision.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionUpdate {
    pub status: InventoryStatus,
    pub comments: String,
    pub processed_by: ProcessedBy,
    pub processed_at: DateTime<Utc>,
}

impl DecisionUpdate {
    pub fn manual(status: InventoryStatus, comments: impl Into<String>) -> Self {
        Self {
            status,
            comments: comments.into(),
            processed_by: ProcessedBy::Manual,
            processed_at: Utc::now(),
        }
    }
}

/// Record store for inventory items.
///
/// Every lookup is scoped by tenant: an item owned by another tenant is
/// reported as absent. Implementations own write atomicity.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Stores a new item.
    async fn create(&self, item: &InventoryItem) -> InventoryResult<InventoryItem>;

    /// Fetches an item owned by `tenant_id`.
    async fn get(&self, tenant_id: &TenantId, id: Uuid) -> InventoryResult<Option<InventoryItem>>;

    /// Applies a decision to an item owned by `tenant_id`.
    ///
    /// Returns `InventoryError::NotFound` when there is no such item.
    async fn update_decision(
        &self,
        tenant_id: &TenantId,
        id: Uuid,
        update: &DecisionUpdate,
    ) -> InventoryResult<InventoryItem>;

    /// Lists items owned by any of `tenant_ids`, newest first.
    async fn list(
        &self,
        tenant_ids: &[TenantId],
        filter: &InventoryFilter,
        pagination: &Pagination,
    ) -> InventoryResult<Page<InventoryItem>>;

    /// Counts items owned by any of `tenant_ids`.
    async fn summary(&self, tenant_ids: &[TenantId]) -> InventoryResult<InventorySummary>;
}
