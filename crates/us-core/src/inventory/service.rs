//! Inventory orchestration: triage, persistence and manual overrides.

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use us_connectors::EquipmentData;
use us_observability::{
    decision_span, inventory_span, AuditEventType, AuditLog, AuditResult, MetricsCollector,
};
use uuid::Uuid;

use super::repo::{DecisionUpdate, InventoryError, InventoryRepository, InventoryResult};
use super::{
    normalize_payload, BatchReceipt, BulkDecisionReceipt, DecisionOutcome, InventoryFilter,
    InventoryItem, InventoryStatus, InventorySummary, ItemDecision, ItemOutcome, ProcessedBy,
};
use crate::auth::{require_permission, require_resource_tenant, AccessError, Permission, Principal};
use crate::pagination::{Page, Pagination};
use crate::tenant::{accessible_tenant_ids, TenantDirectory, TenantId};
use crate::triage::AiDecisionPipeline;

/// Actor recorded for calls made without a principal.
const SYSTEM_ACTOR: &str = "system";

/// Receives equipment, decides it and stores the resulting items.
///
/// Without an AI pipeline every received record is approved by rule.
#[derive(Clone)]
pub struct InventoryService {
    repository: Arc<dyn InventoryRepository>,
    pipeline: Option<AiDecisionPipeline>,
    audit_log: Option<Arc<AuditLog>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl InventoryService {
    /// Creates a service with no AI backend.
    pub fn new(repository: Arc<dyn InventoryRepository>) -> Self {
        Self {
            repository,
            pipeline: None,
            audit_log: None,
            metrics: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: AiDecisionPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_audit_log(mut self, audit_log: Arc<AuditLog>) -> Self {
        self.audit_log = Some(audit_log);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// True when records go through the AI pipeline.
    pub fn has_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Receives a batch for `tenant_id`.
    pub async fn receive(&self, tenant_id: &TenantId, items: Vec<EquipmentData>) -> BatchReceipt {
        self.receive_as(SYSTEM_ACTOR, tenant_id, items).await
    }

    /// Normalizes a webhook body and receives it.
    pub async fn receive_payload(
        &self,
        tenant_id: &TenantId,
        payload: serde_json::Value,
    ) -> InventoryResult<BatchReceipt> {
        let items = normalize_payload(payload)?;
        Ok(self.receive(tenant_id, items).await)
    }

    /// Receives a batch after checking `inventory:write` on the tenant.
    ///
    /// Only root principals may receive into another tenant.
    pub async fn receive_authorized(
        &self,
        principal: Option<&Principal>,
        tenant_id: &TenantId,
        items: Vec<EquipmentData>,
    ) -> InventoryResult<BatchReceipt> {
        self.authorize(principal, Permission::InventoryWrite, tenant_id)
            .await?;
        let actor = principal.map(Principal::audit_identity);
        Ok(self
            .receive_as(actor.as_deref().unwrap_or(SYSTEM_ACTOR), tenant_id, items)
            .await)
    }

    async fn receive_as(
        &self,
        actor: &str,
        tenant_id: &TenantId,
        items: Vec<EquipmentData>,
    ) -> BatchReceipt {
        let received = items.len();
        info!(
            tenant_id = %tenant_id,
            received,
            ai = self.has_pipeline(),
            "Receiving equipment batch"
        );

        let mut tasks = JoinSet::new();
        for (index, equipment) in items.into_iter().enumerate() {
            let span = inventory_span!(tenant_id, index, hostname = ?equipment.hostname);
            let service = self.clone();
            let tenant_id = tenant_id.clone();
            let actor = actor.to_string();
            let task = async move {
                let outcome = service.process_item(&actor, &tenant_id, equipment).await;
                (index, outcome)
            };
            tasks.spawn(task.instrument(span));
        }

        let mut results: Vec<Option<ItemOutcome>> = (0..received).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(e) => warn!(error = %e, "Inventory task did not complete"),
            }
        }

        let results: Vec<ItemOutcome> = results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(aborted_outcome))
            .collect();
        let processed = results.iter().filter(|r| r.success).count();

        if let Some(ref audit_log) = self.audit_log {
            let result = if processed == received {
                AuditResult::Success
            } else {
                let failed = received - processed;
                AuditResult::Failure(format!("{} of {} items not stored", failed, received))
            };
            audit_log
                .log_tenant_event(
                    AuditEventType::InventoryReceived,
                    actor,
                    tenant_id.as_str(),
                    &format!("Received {} equipment records", received),
                    serde_json::json!({ "received": received, "processed": processed }),
                    result,
                )
                .await;
        }

        BatchReceipt {
            received,
            processed,
            results,
        }
    }

    /// Decides and stores one record. Storage failures are reported in the
    /// outcome, never raised.
    pub async fn process_item(
        &self,
        actor: &str,
        tenant_id: &TenantId,
        equipment: EquipmentData,
    ) -> ItemOutcome {
        let started = Instant::now();

        let decision = match self.pipeline {
            Some(ref pipeline) => {
                ItemDecision::from_ai(pipeline.process_equipment(&equipment).await)
            }
            None => ItemDecision::rule_approval(),
        };
        let item = InventoryItem::from_equipment(tenant_id.clone(), equipment, &decision);

        let stored = self.repository.create(&item).await;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        match stored {
            Ok(item) => {
                debug!(
                    item_id = %item.id,
                    status = %item.status,
                    processed_by = %item.processed_by,
                    "Inventory item stored"
                );
                if let Some(ref metrics) = self.metrics {
                    metrics
                        .record_item_processed(item.status.as_str(), item.processed_by.as_str())
                        .await;
                }
                if let Some(ref audit_log) = self.audit_log {
                    let event_type = match decision.processed_by {
                        ProcessedBy::Rule => AuditEventType::RuleDecision,
                        _ => AuditEventType::AiDecision,
                    };
                    audit_log
                        .log_item_event(
                            event_type,
                            actor,
                            tenant_id.as_str(),
                            item.id,
                            &format!("Item {}", item.status),
                            serde_json::json!({
                                "hostname": item.hostname,
                                "risk_score": item.risk_score,
                                "ai_decision": decision.ai_decision,
                            }),
                            AuditResult::Success,
                        )
                        .await;
                }

                ItemOutcome {
                    success: true,
                    status: item.status,
                    item: Some(item),
                    processing_time_ms,
                    ai_decision: decision.ai_decision,
                    comments: decision.comments,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, hostname = ?item.hostname, "Failed to store inventory item");
                ItemOutcome {
                    success: false,
                    status: decision.status,
                    item: None,
                    processing_time_ms,
                    ai_decision: decision.ai_decision,
                    comments: decision.comments,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Approves an item by hand, whatever its previous state.
    pub async fn approve(
        &self,
        tenant_id: &TenantId,
        item_id: Uuid,
        comments: &str,
    ) -> InventoryResult<InventoryItem> {
        self.decide(
            SYSTEM_ACTOR,
            tenant_id,
            item_id,
            InventoryStatus::Approved,
            comments,
        )
        .await
    }

    /// Rejects an item by hand, whatever its previous state.
    pub async fn reject(
        &self,
        tenant_id: &TenantId,
        item_id: Uuid,
        comments: &str,
    ) -> InventoryResult<InventoryItem> {
        self.decide(
            SYSTEM_ACTOR,
            tenant_id,
            item_id,
            InventoryStatus::Rejected,
            comments,
        )
        .await
    }

    /// [`approve`](Self::approve) behind an `inventory:approve` check.
    pub async fn approve_authorized(
        &self,
        principal: Option<&Principal>,
        tenant_id: &TenantId,
        item_id: Uuid,
        comments: &str,
    ) -> InventoryResult<InventoryItem> {
        let actor = self.authorize_decision(principal, tenant_id).await?;
        self.decide(
            &actor,
            tenant_id,
            item_id,
            InventoryStatus::Approved,
            comments,
        )
        .await
    }

    /// [`reject`](Self::reject) behind an `inventory:approve` check.
    pub async fn reject_authorized(
        &self,
        principal: Option<&Principal>,
        tenant_id: &TenantId,
        item_id: Uuid,
        comments: &str,
    ) -> InventoryResult<InventoryItem> {
        let actor = self.authorize_decision(principal, tenant_id).await?;
        self.decide(
            &actor,
            tenant_id,
            item_id,
            InventoryStatus::Rejected,
            comments,
        )
        .await
    }

    /// Approves every listed item. Missing IDs are reported per item and do
    /// not stop the rest.
    pub async fn approve_many(
        &self,
        tenant_id: &TenantId,
        item_ids: &[Uuid],
        comments: &str,
    ) -> BulkDecisionReceipt {
        self.decide_many(
            SYSTEM_ACTOR,
            tenant_id,
            item_ids,
            InventoryStatus::Approved,
            comments,
        )
        .await
    }

    /// Rejects every listed item, reporting missing IDs per item.
    pub async fn reject_many(
        &self,
        tenant_id: &TenantId,
        item_ids: &[Uuid],
        comments: &str,
    ) -> BulkDecisionReceipt {
        self.decide_many(
            SYSTEM_ACTOR,
            tenant_id,
            item_ids,
            InventoryStatus::Rejected,
            comments,
        )
        .await
    }

    /// [`approve_many`](Self::approve_many) behind an `inventory:approve` check.
    pub async fn approve_many_authorized(
        &self,
        principal: Option<&Principal>,
        tenant_id: &TenantId,
        item_ids: &[Uuid],
        comments: &str,
    ) -> InventoryResult<BulkDecisionReceipt> {
        let actor = self.authorize_decision(principal, tenant_id).await?;
        let receipt = self
            .decide_many(
                &actor,
                tenant_id,
                item_ids,
                InventoryStatus::Approved,
                comments,
            )
            .await;
        Ok(receipt)
    }

    /// [`reject_many`](Self::reject_many) behind an `inventory:approve` check.
    pub async fn reject_many_authorized(
        &self,
        principal: Option<&Principal>,
        tenant_id: &TenantId,
        item_ids: &[Uuid],
        comments: &str,
    ) -> InventoryResult<BulkDecisionReceipt> {
        let actor = self.authorize_decision(principal, tenant_id).await?;
        let receipt = self
            .decide_many(
                &actor,
                tenant_id,
                item_ids,
                InventoryStatus::Rejected,
                comments,
            )
            .await;
        Ok(receipt)
    }

    /// Checks `inventory:approve` on the tenant and returns the audit actor.
    async fn authorize_decision(
        &self,
        principal: Option<&Principal>,
        tenant_id: &TenantId,
    ) -> InventoryResult<String> {
        self.authorize(principal, Permission::InventoryApprove, tenant_id)
            .await?;
        Ok(principal
            .map(Principal::audit_identity)
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string()))
    }

    async fn decide_many(
        &self,
        actor: &str,
        tenant_id: &TenantId,
        item_ids: &[Uuid],
        status: InventoryStatus,
        comments: &str,
    ) -> BulkDecisionReceipt {
        let mut results = Vec::with_capacity(item_ids.len());
        for &id in item_ids {
            let outcome = match self.decide(actor, tenant_id, id, status, comments).await {
                Ok(item) => DecisionOutcome {
                    item_id: id,
                    success: true,
                    item: Some(item),
                    error: None,
                },
                Err(e) => {
                    warn!(item_id = %id, error = %e, "Bulk decision skipped item");
                    DecisionOutcome {
                        item_id: id,
                        success: false,
                        item: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(outcome);
        }

        let updated = results.iter().filter(|r| r.success).count();
        info!(
            tenant_id = %tenant_id,
            status = %status,
            requested = item_ids.len(),
            updated,
            "Bulk inventory decision"
        );

        BulkDecisionReceipt {
            status,
            requested: item_ids.len(),
            updated,
            results,
        }
    }

    async fn decide(
        &self,
        actor: &str,
        tenant_id: &TenantId,
        item_id: Uuid,
        status: InventoryStatus,
        comments: &str,
    ) -> InventoryResult<InventoryItem> {
        let span = decision_span!(tenant_id, item_id, status);
        self.apply_decision(actor, tenant_id, item_id, status, comments)
            .instrument(span)
            .await
    }

    async fn apply_decision(
        &self,
        actor: &str,
        tenant_id: &TenantId,
        item_id: Uuid,
        status: InventoryStatus,
        comments: &str,
    ) -> InventoryResult<InventoryItem> {
        let update = DecisionUpdate::manual(status, comments);
        let item = self
            .repository
            .update_decision(tenant_id, item_id, &update)
            .await?;

        info!(actor, "Manual inventory decision");
        if let Some(ref metrics) = self.metrics {
            metrics.record_override(status.as_str()).await;
        }
        if let Some(ref audit_log) = self.audit_log {
            let event_type = match status {
                InventoryStatus::Rejected => AuditEventType::ManualRejection,
                _ => AuditEventType::ManualApproval,
            };
            audit_log
                .log_item_event(
                    event_type,
                    actor,
                    tenant_id.as_str(),
                    item_id,
                    &format!("Item manually {}", status),
                    serde_json::json!({ "comments": comments }),
                    AuditResult::Success,
                )
                .await;
        }

        Ok(item)
    }

    /// Fetches one item of `tenant_id`.
    pub async fn get_item(
        &self,
        tenant_id: &TenantId,
        item_id: Uuid,
    ) -> InventoryResult<InventoryItem> {
        self.repository
            .get(tenant_id, item_id)
            .await?
            .ok_or(InventoryError::NotFound(item_id))
    }

    /// Lists the items of one tenant.
    pub async fn list(
        &self,
        tenant_id: &TenantId,
        filter: &InventoryFilter,
        pagination: &Pagination,
    ) -> InventoryResult<Page<InventoryItem>> {
        self.repository
            .list(std::slice::from_ref(tenant_id), filter, pagination)
            .await
    }

    /// Lists items across every tenant the principal's tenant can reach.
    ///
    /// Requires `inventory:read`.
    pub async fn list_visible(
        &self,
        principal: Option<&Principal>,
        directory: &dyn TenantDirectory,
        filter: &InventoryFilter,
        pagination: &Pagination,
    ) -> InventoryResult<Page<InventoryItem>> {
        let principal = self.check(principal, Permission::InventoryRead).await?;
        let tenant_ids =
            accessible_tenant_ids(directory, &principal.tenant_id, principal.tenant_type).await?;
        self.repository.list(&tenant_ids, filter, pagination).await
    }

    /// Status, asset type and OS counts for one tenant.
    pub async fn summary(&self, tenant_id: &TenantId) -> InventoryResult<InventorySummary> {
        self.repository
            .summary(std::slice::from_ref(tenant_id))
            .await
    }

    async fn check<'a>(
        &self,
        principal: Option<&'a Principal>,
        permission: Permission,
    ) -> InventoryResult<&'a Principal> {
        match require_permission(principal, permission) {
            Ok(()) => principal.ok_or(InventoryError::Access(AccessError::Unauthenticated)),
            Err(e) => Err(self.denied(principal, None, e).await),
        }
    }

    async fn authorize(
        &self,
        principal: Option<&Principal>,
        permission: Permission,
        tenant_id: &TenantId,
    ) -> InventoryResult<()> {
        let checked = require_permission(principal, permission)
            .and_then(|()| require_resource_tenant(principal, tenant_id));
        match checked {
            Ok(()) => Ok(()),
            Err(e) => Err(self.denied(principal, Some(tenant_id), e).await),
        }
    }

    async fn denied(
        &self,
        principal: Option<&Principal>,
        tenant_id: Option<&TenantId>,
        error: AccessError,
    ) -> InventoryError {
        if let Some(ref audit_log) = self.audit_log {
            let actor = principal
                .map(Principal::audit_identity)
                .unwrap_or_else(|| "anonymous".to_string());
            let tenant = tenant_id
                .or(principal.map(|p| &p.tenant_id))
                .map(TenantId::as_str)
                .unwrap_or("");
            audit_log
                .log_tenant_event(
                    AuditEventType::AccessDenied,
                    &actor,
                    tenant,
                    "Inventory access denied",
                    serde_json::json!({}),
                    AuditResult::Denied(error.to_string()),
                )
                .await;
        }
        InventoryError::Access(error)
    }
}

fn aborted_outcome() -> ItemOutcome {
    ItemOutcome {
        success: false,
        status: InventoryStatus::Pending,
        item: None,
        processing_time_ms: 0,
        ai_decision: None,
        comments: String::new(),
        error: Some("processing task aborted".to_string()),
    }
}
