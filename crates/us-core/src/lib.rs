//! # us-core
//!
//! Core authorization and inventory triage for UnderSight.
//!
//! This crate provides the tenant hierarchy and request-scoped tenant
//! context, the permission catalog and access checks, the AI decision
//! pipeline, and the inventory service that ties them together.

pub mod auth;
pub mod inventory;
pub mod pagination;
pub mod tenant;
pub mod triage;

pub use auth::{
    can_access_resource, require_all_permissions, require_any_permission, require_permission,
    require_resource_tenant, require_tenant_level, AccessError, Permission, PermissionRegistry,
    Principal, PrincipalClaims, Requirement, Role,
};
pub use inventory::{
    BatchReceipt, BulkDecisionReceipt, DecisionOutcome, InMemoryInventoryRepository,
    InventoryError, InventoryFilter, InventoryItem, InventoryRepository, InventoryService,
    InventoryStatus, ItemOutcome, ProcessedBy,
};
pub use pagination::{Page, Pagination};
pub use tenant::{
    InMemoryTenantDirectory, RequestTenant, Tenant, TenantContext, TenantDirectory, TenantError,
    TenantId, TenantType,
};
pub use triage::{AiDecisionPipeline, PipelineError, TestAiResult};
