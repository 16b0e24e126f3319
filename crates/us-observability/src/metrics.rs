//! Metrics collection for UnderSight.
//!
//! Counters and histograms go through the `metrics` facade so any installed
//! recorder picks them up. The collector also keeps its own tallies so the
//! CLI can print a summary without an exporter.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshot of inventory processing figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryStats {
    /// Total items processed.
    pub total_items: u64,
    /// Items by resulting status.
    pub items_by_status: HashMap<String, u64>,
    /// Items by decision path (ai, rule, manual).
    pub items_by_processor: HashMap<String, u64>,
    /// AI calls that fell back to pending.
    pub ai_failures: u64,
    /// Share of processed items later overridden by an operator.
    pub override_rate: f64,
}

#[derive(Debug, Default)]
struct Tallies {
    total_items: u64,
    by_status: HashMap<String, u64>,
    by_processor: HashMap<String, u64>,
    ai_failures: u64,
    overrides: u64,
}

/// Metrics collector for inventory triage.
pub struct MetricsCollector {
    tallies: Arc<RwLock<Tallies>>,
}

impl MetricsCollector {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::register_metrics();

        Self {
            tallies: Arc::new(RwLock::new(Tallies::default())),
        }
    }

    /// Registers metric descriptions.
    fn register_metrics() {
        describe_counter!(
            "us_inventory_items_total",
            "Total number of inventory items processed"
        );
        describe_counter!(
            "us_inventory_overrides_total",
            "Total number of manual approve/reject overrides"
        );
        describe_counter!(
            "us_ai_failures_total",
            "Total number of AI calls that fell back to pending"
        );
        describe_counter!(
            "us_access_denied_total",
            "Total number of denied authorization checks"
        );
        describe_histogram!("us_ai_latency_seconds", "AI backend call latency");
    }

    /// Records an item leaving the pipeline.
    pub async fn record_item_processed(&self, status: &str, processed_by: &str) {
        counter!(
            "us_inventory_items_total",
            "status" => status.to_string(),
            "processed_by" => processed_by.to_string()
        )
        .increment(1);

        let mut tallies = self.tallies.write().await;
        tallies.total_items += 1;
        *tallies.by_status.entry(status.to_string()).or_insert(0) += 1;
        *tallies
            .by_processor
            .entry(processed_by.to_string())
            .or_insert(0) += 1;
    }

    /// Records a manual approve or reject.
    pub async fn record_override(&self, status: &str) {
        counter!("us_inventory_overrides_total", "status" => status.to_string()).increment(1);
        self.tallies.write().await.overrides += 1;
    }

    /// Records an AI call that fell back to pending.
    pub async fn record_ai_failure(&self, kind: &str) {
        counter!("us_ai_failures_total", "kind" => kind.to_string()).increment(1);
        self.tallies.write().await.ai_failures += 1;
    }

    /// Records AI latency.
    pub fn record_ai_latency(&self, provider: &str, latency_secs: f64) {
        histogram!("us_ai_latency_seconds", "provider" => provider.to_string())
            .record(latency_secs);
    }

    /// Records a denied authorization check.
    pub fn record_access_denied(requirement: &str) {
        counter!("us_access_denied_total", "requirement" => requirement.to_string())
            .increment(1);
    }

    /// Calculates the current statistics.
    pub async fn calculate_stats(&self) -> InventoryStats {
        let tallies = self.tallies.read().await;

        let override_rate = if tallies.total_items > 0 {
            tallies.overrides as f64 / tallies.total_items as f64
        } else {
            0.0
        };

        InventoryStats {
            total_items: tallies.total_items,
            items_by_status: tallies.by_status.clone(),
            items_by_processor: tallies.by_processor.clone(),
            ai_failures: tallies.ai_failures,
            override_rate,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
