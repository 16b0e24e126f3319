//! Audit logging for UnderSight.
//!
//! Every inventory decision, manual override and access denial is recorded
//! here so an operator can reconstruct who decided what, for which tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// An entry in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event type.
    pub event_type: AuditEventType,
    /// Actor (user, principal id or system component).
    pub actor: String,
    /// Tenant the event belongs to, if any.
    pub tenant_id: Option<String>,
    /// Inventory item ID (if applicable).
    pub item_id: Option<Uuid>,
    /// Description of the event.
    pub description: String,
    /// Additional details.
    pub details: serde_json::Value,
    /// Result/outcome.
    pub result: AuditResult,
}

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A batch of equipment was received.
    InventoryReceived,
    /// An AI backend decided an item.
    AiDecision,
    /// The no-AI rule path decided an item.
    RuleDecision,
    /// An operator approved an item.
    ManualApproval,
    /// An operator rejected an item.
    ManualRejection,
    /// An authorization check failed.
    AccessDenied,
    /// An AI configuration was test-run.
    ConfigTested,
}

/// Result of an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failure(String),
    Denied(String),
}

/// Audit log with bounded in-memory storage.
pub struct AuditLog {
    /// In-memory log entries.
    entries: Arc<RwLock<VecDeque<AuditLogEntry>>>,
    /// Maximum entries to keep in memory.
    max_entries: usize,
    /// Whether to also log to tracing.
    log_to_tracing: bool,
}

impl AuditLog {
    /// Creates a new audit log.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_entries))),
            max_entries,
            log_to_tracing: true,
        }
    }

    /// Creates an audit log without tracing output.
    pub fn without_tracing(max_entries: usize) -> Self {
        Self {
            log_to_tracing: false,
            ..Self::new(max_entries)
        }
    }

    /// Logs an audit entry.
    pub async fn log(&self, entry: AuditLogEntry) {
        if self.log_to_tracing {
            info!(
                event_type = ?entry.event_type,
                actor = %entry.actor,
                tenant_id = ?entry.tenant_id,
                item_id = ?entry.item_id,
                result = ?entry.result,
                "Audit: {}",
                entry.description
            );
        }

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Logs an event that is not tied to a tenant.
    pub async fn log_event(
        &self,
        event_type: AuditEventType,
        actor: &str,
        description: &str,
        result: AuditResult,
    ) {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            actor: actor.to_string(),
            tenant_id: None,
            item_id: None,
            description: description.to_string(),
            details: serde_json::json!({}),
            result,
        };
        self.log(entry).await;
    }

    /// Logs an event scoped to a tenant.
    pub async fn log_tenant_event(
        &self,
        event_type: AuditEventType,
        actor: &str,
        tenant_id: &str,
        description: &str,
        details: serde_json::Value,
        result: AuditResult,
    ) {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            actor: actor.to_string(),
            tenant_id: Some(tenant_id.to_string()),
            item_id: None,
            description: description.to_string(),
            details,
            result,
        };
        self.log(entry).await;
    }

    /// Logs an event about one inventory item.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_item_event(
        &self,
        event_type: AuditEventType,
        actor: &str,
        tenant_id: &str,
        item_id: Uuid,
        description: &str,
        details: serde_json::Value,
        result: AuditResult,
    ) {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            actor: actor.to_string(),
            tenant_id: Some(tenant_id.to_string()),
            item_id: Some(item_id),
            description: description.to_string(),
            details,
            result,
        };
        self.log(entry).await;
    }

    /// Gets all entries.
    pub async fn get_entries(&self) -> Vec<AuditLogEntry> {
        let entries = self.entries.read().await;
        entries.iter().cloned().collect()
    }

    /// Gets entries for a specific tenant.
    pub async fn get_tenant_entries(&self, tenant_id: &str) -> Vec<AuditLogEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.tenant_id.as_deref() == Some(tenant_id))
            .cloned()
            .collect()
    }

    /// Gets entries for a specific inventory item.
    pub async fn get_item_entries(&self, item_id: Uuid) -> Vec<AuditLogEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.item_id == Some(item_id))
            .cloned()
            .collect()
    }

    /// Gets entries by event type.
    pub async fn get_entries_by_type(&self, event_type: AuditEventType) -> Vec<AuditLogEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Exports all entries as JSON.
    pub async fn export_json(&self) -> String {
        let entries = self.get_entries().await;
        serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
    }

    /// Gets the number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Checks if the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Clears all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(10000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_event() {
        let log = AuditLog::without_tracing(100);

        log.log_event(
            AuditEventType::ConfigTested,
            "cli",
            "AI configuration test",
            AuditResult::Success,
        )
        .await;

        let entries = log.get_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, AuditEventType::ConfigTested);
        assert!(entries[0].tenant_id.is_none());
    }

    #[tokio::test]
    async fn test_item_event() {
        let log = AuditLog::without_tracing(100);
        let item_id = Uuid::new_v4();

        log.log_item_event(
            AuditEventType::ManualApproval,
            "user-1",
            "t1",
            item_id,
            "Approved srv1",
            serde_json::json!({"comments": "known host"}),
            AuditResult::Success,
        )
        .await;
        log.log_tenant_event(
            AuditEventType::InventoryReceived,
            "n8n",
            "t2",
            "Received 3 items",
            serde_json::json!({"count": 3}),
            AuditResult::Success,
        )
        .await;

        assert_eq!(log.get_item_entries(item_id).await.len(), 1);
        assert_eq!(log.get_tenant_entries("t1").await.len(), 1);
        assert_eq!(log.get_tenant_entries("t2").await.len(), 1);
        assert_eq!(
            log.get_entries_by_type(AuditEventType::InventoryReceived)
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_max_entries() {
        let log = AuditLog::without_tracing(5);

        for i in 0..10 {
            log.log_event(
                AuditEventType::AccessDenied,
                &format!("user-{}", i),
                "denied",
                AuditResult::Denied("inventory:approve required".into()),
            )
            .await;
        }

        let entries = log.get_entries().await;
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].actor, "user-5");
    }

    #[tokio::test]
    async fn test_export_json() {
        let log = AuditLog::without_tracing(10);
        log.log_event(
            AuditEventType::RuleDecision,
            "system",
            "Auto-approved",
            AuditResult::Success,
        )
        .await;

        let json = log.export_json().await;
        assert!(json.contains("rule_decision"));
        assert!(json.contains("Auto-approved"));

        log.clear().await;
        assert!(log.is_empty().await);
    }

    #[test]
    fn test_result_serialization() {
        let denied = AuditResult::Denied("t2".into());
        assert_eq!(
            serde_json::to_value(&denied).unwrap(),
            serde_json::json!({ "denied": "t2" })
        );
        let success = serde_json::to_value(AuditResult::Success).unwrap();
        assert_eq!(success, "success");
    }
}
