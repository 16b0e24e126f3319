//! Process command - ingests a JSON equipment batch for a tenant.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use us_core::auth::{Principal, Role};
use us_core::inventory::{
    normalize_payload, BatchReceipt, InMemoryInventoryRepository, InventoryService,
    InventoryStatus,
};
use us_core::tenant::{RequestTenant, TenantId, TenantType};
use us_core::triage::AiDecisionPipeline;
use us_observability::{AuditLog, MetricsCollector};

use crate::config::AppConfig;
use crate::OutputFormat;

/// Arguments of the `process` command.
#[derive(Debug, Clone, Args)]
pub struct ProcessArgs {
    /// JSON file holding `{"items": [...]}`, an array, or one record
    pub file: PathBuf,

    /// Tenant the caller belongs to
    #[arg(short, long)]
    pub tenant: String,

    /// Type of the caller's tenant (root, provider, customer, sub_customer)
    #[arg(long, default_value = "customer")]
    pub tenant_type: String,

    /// Role the caller acts as
    #[arg(short, long, default_value = "analyst")]
    pub role: String,

    /// Caller ID recorded in the audit trail
    #[arg(long, default_value = "cli")]
    pub user: String,

    /// Tenant receiving the items (defaults to the caller's tenant)
    #[arg(long)]
    pub into: Option<String>,

    /// Skip the AI backend and apply the auto-approve rule
    #[arg(long)]
    pub no_ai: bool,
}

/// Runs the batch through the inventory service as the given caller.
pub async fn cmd_process(
    config: &AppConfig,
    args: ProcessArgs,
    format: OutputFormat,
) -> Result<()> {
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read equipment file: {}", args.file.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse equipment file: {}", args.file.display()))?;
    let items = normalize_payload(payload)?;

    let registry = config.permission_registry()?;
    let tenant_type: TenantType = args.tenant_type.parse()?;
    let principal = Principal::from_role(
        args.user.as_str(),
        args.tenant.as_str(),
        tenant_type,
        Role::from(args.role.as_str()),
        &registry,
    );
    let target = args
        .into
        .as_deref()
        .map(TenantId::from)
        .unwrap_or_else(|| principal.tenant_id.clone());

    let metrics = Arc::new(MetricsCollector::new());
    let mut service = InventoryService::new(Arc::new(InMemoryInventoryRepository::new()))
        .with_audit_log(Arc::new(AuditLog::new(10_000)))
        .with_metrics(metrics.clone());

    if config.ai.enabled && !args.no_ai {
        let ai_config = config.ai.to_ai_config()?;
        let pipeline = AiDecisionPipeline::from_config(&ai_config)
            .context("Failed to build AI pipeline")?
            .with_metrics(metrics.clone());
        service = service.with_pipeline(pipeline);
    }

    let receipt = RequestTenant::scope_with(
        principal.tenant_context(),
        service.receive_authorized(Some(&principal), &target, items),
    )
    .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        OutputFormat::Text => {
            print_receipt(&target, &receipt, service.has_pipeline());
            let stats = metrics.calculate_stats().await;
            if stats.ai_failures > 0 {
                println!(
                    "  {} {} AI call(s) fell back to pending",
                    "⚠".yellow(),
                    stats.ai_failures
                );
            }
        }
    }

    Ok(())
}

fn print_receipt(tenant: &TenantId, receipt: &BatchReceipt, ai: bool) {
    let mode = if ai { "AI" } else { "rule" };
    println!(
        "{} {} item(s) for tenant {} ({} decisions)",
        "Received".bold(),
        receipt.received,
        tenant.as_str().cyan(),
        mode
    );
    println!("─────────────────────────────────────────");

    for (index, outcome) in receipt.results.iter().enumerate() {
        let hostname = outcome
            .item
            .as_ref()
            .and_then(|item| item.hostname.clone())
            .unwrap_or_else(|| "-".to_string());

        if !outcome.success {
            println!(
                "{:>3}  {:<24} {} {}",
                index + 1,
                hostname,
                "ERROR".red().bold(),
                outcome.error.as_deref().unwrap_or("")
            );
            continue;
        }

        let status = match outcome.status {
            InventoryStatus::Approved => "approved".green(),
            InventoryStatus::Rejected => "rejected".red(),
            InventoryStatus::Pending => "pending".yellow(),
        };
        let risk = outcome.item.as_ref().map_or(0, |item| item.risk_score);
        println!(
            "{:>3}  {:<24} {:<9} risk {:>3}  {}ms  {}",
            index + 1,
            hostname,
            status,
            risk,
            outcome.processing_time_ms,
            outcome.comments.dimmed()
        );
    }

    println!();
    println!(
        "Stored {}/{} item(s)",
        receipt.processed.to_string().bold(),
        receipt.received
    );
}
