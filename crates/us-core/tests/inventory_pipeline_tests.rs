//! End-to-end inventory triage through the AI decision pipeline.

use std::sync::Arc;
use std::time::Duration;

use us_connectors::{
    ConnectorError, Decision, EquipmentData, MockAiBehavior, MockAiConnector,
    DEFAULT_PROMPT_TEMPLATE,
};
use us_core::inventory::{
    InMemoryInventoryRepository, InventoryFilter, InventoryService, InventoryStatus, ProcessedBy,
};
use us_core::pagination::Pagination;
use us_core::triage::AiDecisionPipeline;
use us_core::TenantId;
use us_observability::{AuditEventType, AuditLog};
use uuid::Uuid;

fn host(name: &str) -> EquipmentData {
    EquipmentData::from_source("n8n").with_hostname(name)
}

fn service_with(mock: Arc<MockAiConnector>, timeout: Duration) -> InventoryService {
    let pipeline = AiDecisionPipeline::new(mock, DEFAULT_PROMPT_TEMPLATE, timeout);
    InventoryService::new(Arc::new(InMemoryInventoryRepository::new())).with_pipeline(pipeline)
}

#[tokio::test]
async fn approved_server_gets_merged_tags() {
    let mock = Arc::new(MockAiConnector::with_reply(
        "mock",
        r#"{"decision":"approved","confidence":0.9,"suggested_tags":["linux"]}"#,
    ));
    let service = service_with(mock.clone(), Duration::from_secs(30));

    let receipt = service
        .receive(&"t1".into(), vec![host("srv1").with_tags(["prod"])])
        .await;

    let outcome = &receipt.results[0];
    assert!(outcome.success);
    assert_eq!(outcome.ai_decision, Some(Decision::Approved));

    let item = outcome.item.as_ref().unwrap();
    assert_eq!(item.status, InventoryStatus::Approved);
    assert_eq!(item.processed_by, ProcessedBy::Ai);
    assert_eq!(item.tenant_id, TenantId::from("t1"));
    assert_eq!(item.tags, vec!["prod", "linux"]);
    assert_eq!(item.risk_score, 0);

    let prompt = &mock.prompts().await[0];
    assert!(prompt.contains("srv1"));
    assert!(prompt.contains("prod"));
}

#[tokio::test(start_paused = true)]
async fn batch_keeps_input_order_under_reversed_latencies() {
    let mock = Arc::new(MockAiConnector::new("mock"));
    let names = ["host-a", "host-b", "host-c", "host-d", "host-e"];
    for (i, name) in names.iter().enumerate() {
        let latency = Duration::from_millis(100 * (names.len() - i) as u64);
        let reply = format!(r#"{{"decision": "approved", "comments": "{}"}}"#, name);
        mock.reply_when_after(name, &reply, latency).await;
    }
    let service = service_with(mock, Duration::from_secs(30));

    let receipt = service
        .receive(&"t1".into(), names.iter().map(|n| host(n)).collect())
        .await;

    assert_eq!(receipt.received, names.len());
    assert_eq!(receipt.processed, names.len());
    for (outcome, name) in receipt.results.iter().zip(names) {
        assert_eq!(outcome.comments, name);
        assert_eq!(
            outcome.item.as_ref().unwrap().hostname.as_deref(),
            Some(name)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn slow_backend_yields_pending_without_cancelling_siblings() {
    let mock = Arc::new(MockAiConnector::new("mock"));
    mock.reply_when_after(
        "slow-host",
        r#"{"decision": "approved"}"#,
        Duration::from_secs(120),
    )
    .await;
    let service = service_with(mock, Duration::from_secs(30));

    let receipt = service
        .receive(&"t1".into(), vec![host("slow-host"), host("fast-host")])
        .await;

    let slow = receipt.results[0].item.as_ref().unwrap();
    assert_eq!(slow.status, InventoryStatus::Pending);
    assert!(slow.inventory_comments.starts_with("AI processing failed:"));
    assert_eq!(receipt.results[0].ai_decision, Some(Decision::Pending));

    let fast = receipt.results[1].item.as_ref().unwrap();
    assert_eq!(fast.status, InventoryStatus::Approved);
}

#[tokio::test]
async fn failing_backend_keeps_item_pending() {
    let mock = Arc::new(MockAiConnector::new("mock"));
    mock.set_behavior(MockAiBehavior::FailOn {
        pattern: "flaky".into(),
        error: ConnectorError::RateLimited(30),
    })
    .await;
    let service = service_with(mock, Duration::from_secs(30));

    let receipt = service
        .receive(&"t1".into(), vec![host("flaky"), host("steady")])
        .await;

    assert_eq!(receipt.processed, 2);
    assert_eq!(receipt.results[0].status, InventoryStatus::Pending);
    assert!(receipt.results[0].comments.contains("Rate limited"));
    assert_eq!(receipt.results[1].status, InventoryStatus::Approved);
}

#[tokio::test]
async fn without_ai_everything_is_rule_approved() {
    let service = InventoryService::new(Arc::new(InMemoryInventoryRepository::new()));

    let receipt = service
        .receive(&"t1".into(), vec![host("a"), host("b").with_tags(["x"])])
        .await;

    for outcome in &receipt.results {
        let item = outcome.item.as_ref().unwrap();
        assert_eq!(item.status, InventoryStatus::Approved);
        assert_eq!(item.processed_by, ProcessedBy::Rule);
        assert_eq!(item.risk_score, 0);
        assert_eq!(item.inventory_comments, "Auto-approved: No AI configuration");
    }
    assert_eq!(receipt.results[1].item.as_ref().unwrap().tags, vec!["x"]);
}

#[tokio::test]
async fn manual_override_replaces_ai_decision() {
    let mock = Arc::new(MockAiConnector::with_reply(
        "mock",
        r#"{"decision": "rejected", "comments": "unsupported OS", "suggested_risk_score": 90}"#,
    ));
    let audit = Arc::new(AuditLog::without_tracing(100));
    let service = service_with(mock, Duration::from_secs(30)).with_audit_log(audit.clone());
    let tenant = TenantId::from("t1");

    let receipt = service.receive(&tenant, vec![host("legacy")]).await;
    let id = receipt.results[0].item.as_ref().unwrap().id;

    let approved = service.approve(&tenant, id, "risk accepted").await.unwrap();
    assert_eq!(approved.status, InventoryStatus::Approved);
    assert_eq!(approved.processed_by, ProcessedBy::Manual);
    assert_eq!(approved.inventory_comments, "risk accepted");
    assert_eq!(approved.inventory_decision, "unsupported OS");
    assert_eq!(approved.risk_score, 90);

    let rejected = service
        .reject(&tenant, id, "changed my mind")
        .await
        .unwrap();
    assert_eq!(rejected.status, InventoryStatus::Rejected);
    assert_eq!(rejected.processed_by, ProcessedBy::Manual);

    let fetched = service.get_item(&tenant, id).await.unwrap();
    assert_eq!(fetched.status, InventoryStatus::Rejected);

    assert!(service.get_item(&"t2".into(), id).await.is_err());

    let kinds: Vec<AuditEventType> = audit
        .get_item_entries(id)
        .await
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            AuditEventType::AiDecision,
            AuditEventType::ManualApproval,
            AuditEventType::ManualRejection
        ]
    );
}

#[tokio::test]
async fn webhook_payload_and_listing() {
    let service = InventoryService::new(Arc::new(InMemoryInventoryRepository::new()));
    let tenant = TenantId::from("t1");

    let receipt = service
        .receive_payload(
            &tenant,
            serde_json::json!({
                "batch_id": "b-1",
                "items": [
                    {"hostname": "web-01", "asset_type": "server", "os": "Debian"},
                    {"hostname": "laptop-7", "asset_type": "workstation"},
                    {"hostname": "web-02", "asset_type": "server"}
                ]
            }),
        )
        .await
        .unwrap();
    assert_eq!(receipt.received, 3);

    let page = service
        .list(
            &tenant,
            &InventoryFilter::default().with_asset_type("server"),
            &Pagination::new(1, 1),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages, 2);

    let found = service
        .list(
            &tenant,
            &InventoryFilter::default().with_search("LAPTOP"),
            &Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);

    let summary = service.summary(&tenant).await.unwrap();
    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.approved, 3);
    assert_eq!(summary.by_asset_type["server"], 2);
    assert_eq!(summary.by_os["Debian"], 1);
}

#[tokio::test]
async fn bulk_decisions_report_each_id() {
    let service = InventoryService::new(Arc::new(InMemoryInventoryRepository::new()));
    let tenant = TenantId::from("t1");

    let receipt = service
        .receive(&tenant, vec![host("a"), host("b"), host("c")])
        .await;
    let ids: Vec<Uuid> = receipt
        .results
        .iter()
        .map(|r| r.item.as_ref().unwrap().id)
        .collect();

    let missing = Uuid::new_v4();
    let mixed = [ids[0], missing, ids[2]];
    let bulk = service.reject_many(&tenant, &mixed, "decommissioned").await;

    assert_eq!(bulk.requested, 3);
    assert_eq!(bulk.updated, 2);
    assert_eq!(bulk.failed_ids(), vec![missing]);
    assert_eq!(bulk.results[1].item_id, missing);
    assert!(bulk.results[1].error.as_deref().unwrap().contains("not found"));
    for outcome in [&bulk.results[0], &bulk.results[2]] {
        let item = outcome.item.as_ref().unwrap();
        assert_eq!(item.status, InventoryStatus::Rejected);
        assert_eq!(item.processed_by, ProcessedBy::Manual);
        assert_eq!(item.inventory_comments, "decommissioned");
    }

    let untouched = service.get_item(&tenant, ids[1]).await.unwrap();
    assert_eq!(untouched.status, InventoryStatus::Approved);
    assert_eq!(untouched.processed_by, ProcessedBy::Rule);
}

#[tokio::test]
async fn bulk_approve_with_only_unknown_ids() {
    let service = InventoryService::new(Arc::new(InMemoryInventoryRepository::new()));
    let tenant = TenantId::from("t1");
    let other = service.receive(&"t2".into(), vec![host("elsewhere")]).await;
    let foreign_id = other.results[0].item.as_ref().unwrap().id;

    let ids = [Uuid::new_v4(), foreign_id];
    let bulk = service.approve_many(&tenant, &ids, "ok").await;

    assert_eq!(bulk.requested, 2);
    assert_eq!(bulk.updated, 0);
    assert_eq!(bulk.failed_ids(), ids.to_vec());
    assert!(bulk.results.iter().all(|r| r.item.is_none()));

    let empty = service.approve_many(&tenant, &[], "ok").await;
    assert_eq!(empty.requested, 0);
    assert!(empty.results.is_empty());
}
