//! Check command - evaluates access rules for a caller.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use us_core::auth::{
    require_all_permissions, require_any_permission, require_permission, require_resource_tenant,
    require_tenant_level, AccessError, Permission, Principal, Role,
};
use us_core::tenant::{TenantId, TenantType};

use crate::config::AppConfig;
use crate::OutputFormat;

/// Arguments of the `check` command.
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Tenant the caller belongs to
    #[arg(short, long)]
    pub tenant: String,

    /// Type of the caller's tenant
    #[arg(long, default_value = "customer")]
    pub tenant_type: String,

    /// Role the caller acts as
    #[arg(short, long, default_value = "viewer")]
    pub role: String,

    #[arg(long, default_value = "cli")]
    pub user: String,

    /// Permission to require, e.g. `alerts:read` (repeatable)
    #[arg(short, long = "permission")]
    pub permissions: Vec<String>,

    /// Pass when any listed permission is held instead of all
    #[arg(long)]
    pub any: bool,

    /// Minimum tenant level to require
    #[arg(long)]
    pub level: Option<String>,

    /// Tenant owning the resource being accessed
    #[arg(long)]
    pub resource_tenant: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckOutcome {
    check: String,
    allowed: bool,
    reason: Option<String>,
}

impl CheckOutcome {
    fn from_result(check: String, result: Result<(), AccessError>) -> Self {
        match result {
            Ok(()) => Self {
                check,
                allowed: true,
                reason: None,
            },
            Err(e) => Self {
                check,
                allowed: false,
                reason: Some(e.to_string()),
            },
        }
    }
}

/// Runs each requested check and exits non-zero when any is denied.
pub async fn cmd_check(config: &AppConfig, args: CheckArgs, format: OutputFormat) -> Result<()> {
    let registry = config.permission_registry()?;
    let tenant_type: TenantType = args.tenant_type.parse()?;
    let principal = Principal::from_role(
        args.user.as_str(),
        args.tenant.as_str(),
        tenant_type,
        Role::from(args.role.as_str()),
        &registry,
    );

    let permissions = args
        .permissions
        .iter()
        .map(|name| name.parse::<Permission>().map_err(anyhow::Error::msg))
        .collect::<Result<Vec<_>>>()
        .context("Invalid --permission value")?;

    let mut outcomes = Vec::new();

    match permissions.as_slice() {
        [] => {}
        [single] => outcomes.push(CheckOutcome::from_result(
            format!("permission {}", single),
            require_permission(Some(&principal), *single),
        )),
        many if args.any => outcomes.push(CheckOutcome::from_result(
            format!("any of {}", args.permissions.join(", ")),
            require_any_permission(Some(&principal), many),
        )),
        many => outcomes.push(CheckOutcome::from_result(
            format!("all of {}", args.permissions.join(", ")),
            require_all_permissions(Some(&principal), many),
        )),
    }

    if let Some(level) = &args.level {
        let required: TenantType = level.parse()?;
        outcomes.push(CheckOutcome::from_result(
            format!("tenant level {}", required),
            require_tenant_level(Some(&principal), required),
        ));
    }

    if let Some(resource) = &args.resource_tenant {
        outcomes.push(CheckOutcome::from_result(
            format!("resource tenant {}", resource),
            require_resource_tenant(Some(&principal), &TenantId::from(resource.as_str())),
        ));
    }

    if outcomes.is_empty() {
        anyhow::bail!("Nothing to check: pass --permission, --level or --resource-tenant");
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
        OutputFormat::Text => {
            println!(
                "{} {} ({}, {} tenant {})",
                "Access check for".bold(),
                principal.id.cyan(),
                principal.role,
                principal.tenant_type,
                principal.tenant_id
            );
            println!("─────────────────────────────────────────");
            for outcome in &outcomes {
                if outcome.allowed {
                    println!("  {} {}", "✓".green(), outcome.check);
                } else {
                    println!(
                        "  {} {}: {}",
                        "✗".red(),
                        outcome.check,
                        outcome.reason.as_deref().unwrap_or("denied")
                    );
                }
            }
        }
    }

    if outcomes.iter().any(|o| !o.allowed) {
        std::process::exit(1);
    }

    Ok(())
}
