//! Equipment inventory for UnderSight.
//!
//! Equipment records arrive in batches (usually from an n8n webhook), are
//! triaged by the AI decision pipeline or the no-AI rule, and are stored as
//! [`InventoryItem`]s through an [`InventoryRepository`]. Operators can then
//! approve or reject any item by hand.

mod memory;
mod repo;
mod service;

pub use memory::InMemoryInventoryRepository;
pub use repo::{DecisionUpdate, InventoryError, InventoryRepository, InventoryResult};
pub use service::InventoryService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use us_connectors::{AiOutput, Decision, EquipmentData};
use uuid::Uuid;

use crate::tenant::TenantId;

/// Comment stored on items accepted without an AI backend.
pub const RULE_APPROVAL_COMMENT: &str = "Auto-approved: No AI configuration";

/// Review state of an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryStatus {
    Approved,
    Rejected,
    Pending,
}

impl InventoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::Approved => "approved",
            InventoryStatus::Rejected => "rejected",
            InventoryStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approved" => Ok(InventoryStatus::Approved),
            "rejected" => Ok(InventoryStatus::Rejected),
            "pending" => Ok(InventoryStatus::Pending),
            other => Err(format!("unknown inventory status '{}'", other)),
        }
    }
}

impl From<Decision> for InventoryStatus {
    /// Flagged items wait for a human, like pending ones.
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => InventoryStatus::Approved,
            Decision::Rejected => InventoryStatus::Rejected,
            Decision::Pending | Decision::Flag => InventoryStatus::Pending,
        }
    }
}

/// Who made the current decision on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedBy {
    Ai,
    Manual,
    Rule,
}

impl ProcessedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedBy::Ai => "ai",
            ProcessedBy::Manual => "manual",
            ProcessedBy::Rule => "rule",
        }
    }
}

impl fmt::Display for ProcessedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision applied to a freshly received record.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDecision {
    pub status: InventoryStatus,
    pub comments: String,
    pub risk_score: u32,
    pub suggested_tags: Vec<String>,
    pub suggested_asset_type: Option<String>,
    pub processed_by: ProcessedBy,
    /// The raw AI verdict, absent on the rule path.
    pub ai_decision: Option<Decision>,
}

impl ItemDecision {
    /// Decision taken from an AI pass.
    pub fn from_ai(output: AiOutput) -> Self {
        Self {
            status: output.decision.into(),
            comments: output.comments,
            risk_score: output.suggested_risk_score,
            suggested_tags: output.suggested_tags,
            suggested_asset_type: output.suggested_asset_type,
            processed_by: ProcessedBy::Ai,
            ai_decision: Some(output.decision),
        }
    }

    /// Decision taken when no AI backend is configured.
    pub fn rule_approval() -> Self {
        Self {
            status: InventoryStatus::Approved,
            comments: RULE_APPROVAL_COMMENT.to_string(),
            risk_score: 0,
            suggested_tags: Vec::new(),
            suggested_asset_type: None,
            processed_by: ProcessedBy::Rule,
            ai_decision: None,
        }
    }
}

/// A triaged equipment record owned by one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub source: String,
    pub external_id: Option<String>,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub asset_type: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub owner: Option<String>,
    /// Equipment tags plus AI-suggested tags, without duplicates.
    pub tags: Vec<String>,
    pub risk_score: u32,
    pub status: InventoryStatus,
    /// Comments from the automatic decision.
    pub inventory_decision: String,
    /// Latest comments, overwritten by manual decisions.
    pub inventory_comments: String,
    pub processed_by: ProcessedBy,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
    /// The record as received.
    pub raw_data: serde_json::Value,
}

impl InventoryItem {
    /// Builds a new item from a received record and its decision.
    ///
    /// An AI-suggested asset type replaces the record's own.
    pub fn from_equipment(
        tenant_id: TenantId,
        equipment: EquipmentData,
        decision: &ItemDecision,
    ) -> Self {
        let now = Utc::now();
        let raw_data = serde_json::to_value(&equipment).unwrap_or(serde_json::Value::Null);
        let tags = merge_tags(&equipment.tags, &decision.suggested_tags);
        let asset_type = decision
            .suggested_asset_type
            .clone()
            .or(equipment.asset_type);

        Self {
            id: Uuid::new_v4(),
            tenant_id,
            source: equipment.source,
            external_id: equipment.external_id,
            hostname: equipment.hostname,
            ip_address: equipment.ip_address,
            mac_address: equipment.mac_address,
            os: equipment.os,
            os_version: equipment.os_version,
            asset_type,
            manufacturer: equipment.manufacturer,
            model: equipment.model,
            serial_number: equipment.serial_number,
            location: equipment.location,
            department: equipment.department,
            owner: equipment.owner,
            tags,
            risk_score: decision.risk_score,
            status: decision.status,
            inventory_decision: decision.comments.clone(),
            inventory_comments: decision.comments.clone(),
            processed_by: decision.processed_by,
            processed_at: now,
            created_at: now,
            metadata: equipment.metadata,
            raw_data,
        }
    }

    /// Case-insensitive match against the searchable identity fields.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            &self.hostname,
            &self.ip_address,
            &self.mac_address,
            &self.serial_number,
            &self.external_id,
            &self.owner,
        ]
        .into_iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(&needle))
    }
}

/// Union of two tag lists, first occurrence wins, duplicates dropped.
pub fn merge_tags(existing: &[String], suggested: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    existing
        .iter()
        .chain(suggested)
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}

/// Listing filters. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryFilter {
    #[serde(default)]
    pub status: Option<InventoryStatus>,
    #[serde(default)]
    pub asset_type: Option<String>,
    /// Free text matched against hostname, addresses, serial, owner and
    /// external ID.
    #[serde(default)]
    pub search: Option<String>,
}

impl InventoryFilter {
    pub fn with_status(mut self, status: InventoryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_asset_type(mut self, asset_type: impl Into<String>) -> Self {
        self.asset_type = Some(asset_type.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(status) = self.status {
            if item.status != status {
                return false;
            }
        }
        if let Some(ref wanted) = self.asset_type {
            match item.asset_type {
                Some(ref actual) if actual.eq_ignore_ascii_case(wanted) => {}
                _ => return false,
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => item.matches_search(needle),
            _ => true,
        }
    }
}

/// Per-item result of a received batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// False when the item could not be stored.
    pub success: bool,
    pub status: InventoryStatus,
    pub item: Option<InventoryItem>,
    pub processing_time_ms: u64,
    pub ai_decision: Option<Decision>,
    pub comments: String,
    pub error: Option<String>,
}

/// Result of receiving one batch. `results` follows input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub received: usize,
    /// Items stored successfully.
    pub processed: usize,
    pub results: Vec<ItemOutcome>,
}

/// Per-id result of a bulk approve or reject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub item_id: Uuid,
    pub success: bool,
    /// The item after the update, when it was found.
    pub item: Option<InventoryItem>,
    pub error: Option<String>,
}

/// Result of a bulk approve or reject. `results` follows input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDecisionReceipt {
    pub status: InventoryStatus,
    pub requested: usize,
    /// Items actually updated.
    pub updated: usize,
    pub results: Vec<DecisionOutcome>,
}

impl BulkDecisionReceipt {
    /// IDs that could not be updated.
    pub fn failed_ids(&self) -> Vec<Uuid> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.item_id)
            .collect()
    }
}

/// Counts over a tenant set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_items: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub by_asset_type: BTreeMap<String, u64>,
    pub by_os: BTreeMap<String, u64>,
}

impl InventorySummary {
    /// Folds items into the summary.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Self {
        let mut summary = Self::default();
        for item in items {
            summary.total_items += 1;
            match item.status {
                InventoryStatus::Pending => summary.pending += 1,
                InventoryStatus::Approved => summary.approved += 1,
                InventoryStatus::Rejected => summary.rejected += 1,
            }
            let asset_type = item.asset_type.clone().unwrap_or_else(|| "unknown".into());
            *summary.by_asset_type.entry(asset_type).or_insert(0) += 1;
            let os = item.os.clone().unwrap_or_else(|| "unknown".into());
            *summary.by_os.entry(os).or_insert(0) += 1;
        }
        summary
    }
}

/// Splits a webhook body into equipment records.
///
/// Accepts `{"items": [...]}`, a bare array, or a single record object.
///
/// # Errors
///
/// Returns `InventoryError::InvalidPayload` for any other shape or for a
/// record that does not deserialize.
pub fn normalize_payload(payload: serde_json::Value) -> InventoryResult<Vec<EquipmentData>> {
    use serde_json::Value;

    let records = match payload {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(InventoryError::InvalidPayload(format!(
                    "'items' must be an array, got {}",
                    json_kind(&other)
                )))
            }
            None => vec![Value::Object(map)],
        },
        Value::Array(items) => items,
        other => {
            return Err(InventoryError::InvalidPayload(format!(
                "expected an object or array, got {}",
                json_kind(&other)
            )))
        }
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record)
                .map_err(|e| InventoryError::InvalidPayload(format!("item {}: {}", index, e)))
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Decision::Approved, InventoryStatus::Approved),
            (Decision::Rejected, InventoryStatus::Rejected),
            (Decision::Pending, InventoryStatus::Pending),
            (Decision::Flag, InventoryStatus::Pending),
        ];
        for (decision, status) in cases {
            assert_eq!(InventoryStatus::from(decision), status);
        }
    }

    #[test]
    fn test_merge_tags() {
        let merged = merge_tags(
            &["a".to_string(), "b".to_string()],
            &["b".to_string(), "c".to_string()],
        );
        assert_eq!(merged, vec!["a", "b", "c"]);

        let merged = merge_tags(&["x".to_string(), "x".to_string()], &[]);
        assert_eq!(merged, vec!["x"]);
    }

    #[test]
    fn test_item_from_ai_decision() {
        let mut equipment = EquipmentData::from_source("n8n")
            .with_hostname("srv1")
            .with_tags(["prod"]);
        equipment.asset_type = Some("workstation".into());

        let decision = ItemDecision::from_ai(AiOutput {
            decision: Decision::Flag,
            comments: "check owner".into(),
            confidence: 0.6,
            suggested_tags: vec!["linux".into(), "prod".into()],
            suggested_risk_score: 42,
            suggested_asset_type: Some("server".into()),
        });
        let item = InventoryItem::from_equipment("t1".into(), equipment, &decision);

        assert_eq!(item.status, InventoryStatus::Pending);
        assert_eq!(item.processed_by, ProcessedBy::Ai);
        assert_eq!(item.tags, vec!["prod", "linux"]);
        assert_eq!(item.asset_type.as_deref(), Some("server"));
        assert_eq!(item.risk_score, 42);
        assert_eq!(item.inventory_comments, "check owner");
        assert_eq!(item.raw_data["hostname"], "srv1");
        assert_eq!(item.raw_data["asset_type"], "workstation");
    }

    #[test]
    fn test_rule_approval() {
        let equipment = EquipmentData::from_source("n8n").with_tags(["a"]);
        let item = InventoryItem::from_equipment(
            "t1".into(),
            equipment,
            &ItemDecision::rule_approval(),
        );

        assert_eq!(item.status, InventoryStatus::Approved);
        assert_eq!(item.processed_by, ProcessedBy::Rule);
        assert_eq!(item.risk_score, 0);
        assert_eq!(item.inventory_decision, RULE_APPROVAL_COMMENT);
        assert_eq!(item.tags, vec!["a"]);
    }

    #[test]
    fn test_filter() {
        let mut equipment = EquipmentData::from_source("n8n")
            .with_hostname("DB-Primary")
            .with_ip_address("10.1.2.3");
        equipment.asset_type = Some("Server".into());
        let item = InventoryItem::from_equipment(
            "t1".into(),
            equipment,
            &ItemDecision::rule_approval(),
        );

        assert!(InventoryFilter::default().matches(&item));
        let filter = InventoryFilter::default;
        assert!(filter().with_search("db-prim").matches(&item));
        assert!(filter().with_search("10.1.2").matches(&item));
        assert!(filter().with_asset_type("server").matches(&item));
        assert!(!filter().with_asset_type("vm").matches(&item));
        let pending = filter().with_status(InventoryStatus::Pending);
        assert!(!pending.matches(&item));
        assert!(filter().with_search("  ").matches(&item));
    }

    #[test]
    fn test_normalize_payload_shapes() {
        let payload = json!({"items": [{"hostname": "a"}, {"hostname": "b"}], "batch_id": "x"});
        let batch = normalize_payload(payload).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].hostname.as_deref(), Some("b"));

        let array = normalize_payload(json!([{"hostname": "a"}])).unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0].source, "n8n");

        let single = normalize_payload(json!({"hostname": "solo", "source": "csv"})).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].source, "csv");
    }

    #[test]
    fn test_normalize_payload_rejects_bad_shapes() {
        assert!(matches!(
            normalize_payload(json!("srv1")),
            Err(InventoryError::InvalidPayload(_))
        ));
        assert!(matches!(
            normalize_payload(json!({"items": "srv1"})),
            Err(InventoryError::InvalidPayload(_))
        ));
        let payload = json!([{"hostname": "a"}, {"tags": "not-a-list"}]);
        let err = normalize_payload(payload).unwrap_err();
        assert!(err.to_string().contains("item 1"));
    }

    #[test]
    fn test_summary() {
        let mut a = EquipmentData::from_source("n8n").with_os("Linux");
        a.asset_type = Some("server".into());
        let b = EquipmentData::from_source("n8n");

        let items = vec![
            InventoryItem::from_equipment("t1".into(), a, &ItemDecision::rule_approval()),
            InventoryItem::from_equipment(
                "t1".into(),
                b,
                &ItemDecision::from_ai(AiOutput::failed("down")),
            ),
        ];
        let summary = InventorySummary::from_items(&items);

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.by_asset_type["server"], 1);
        assert_eq!(summary.by_os["unknown"], 1);
    }
}
