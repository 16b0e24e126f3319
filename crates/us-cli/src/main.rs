//! UnderSight CLI
//!
//! Command-line interface for UnderSight tenant-aware inventory triage.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;
mod validator;

use commands::{cmd_check, cmd_process, CheckArgs, ProcessArgs};
use config::AppConfig;
use us_core::triage::AiDecisionPipeline;
use us_observability::{AuditEventType, AuditLog, AuditResult, LoggingConfig};
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "undersight")]
#[command(version)]
#[command(about = "Multi-tenant inventory triage with AI decisions", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Triage an equipment batch for a tenant
    Process(ProcessArgs),

    /// Evaluate access rules for a caller
    Check(CheckArgs),

    /// Run the sample record through the configured AI backend
    TestAi,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },

    /// Validate configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let (config, load_warning) = AppConfig::load_or_default(&config_path, cli.config.is_some())?;

    setup_logging(&config, cli.verbose);

    if let Some(e) = &load_warning {
        tracing::warn!(
            path = %config_path.display(),
            error = %format!("{:#}", e),
            "Ignoring unreadable configuration file, using defaults"
        );
    }

    match cli.command {
        Commands::Process(args) => cmd_process(&config, args, cli.format).await,
        Commands::Check(args) => cmd_check(&config, args, cli.format).await,
        Commands::TestAi => cmd_test_ai(&config, cli.format).await,
        Commands::Config { action } => match action {
            ConfigCommands::Show { show_secrets } => {
                cmd_config_show(config, show_secrets, cli.format)
            }
            ConfigCommands::Validate => cmd_config_validate(&config_path, &config),
        },
    }
}

fn setup_logging(config: &AppConfig, verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config
            .logging
            .level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    };

    let logging = LoggingConfig {
        level,
        json_format: config.logging.json_format,
    };
    if let Err(e) = us_observability::init_logging(&logging) {
        eprintln!("{}: {}", "Logging disabled".yellow(), e);
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "undersight", "undersight") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/undersight.yaml")
    }
}

async fn cmd_test_ai(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let ai_config = config.ai.to_ai_config()?;
    let audit = AuditLog::new(100);

    if format == OutputFormat::Text {
        println!(
            "Testing {} backend with model {}...",
            ai_config.provider.to_string().cyan(),
            ai_config.model.cyan()
        );
    }

    let result = AiDecisionPipeline::test_config(&ai_config).await;

    let audit_result = match &result.error {
        None => AuditResult::Success,
        Some(e) => AuditResult::Failure(e.clone()),
    };
    audit
        .log_event(
            AuditEventType::ConfigTested,
            "cli",
            &format!("Tested {} configuration", ai_config.provider),
            audit_result,
        )
        .await;

    let entries = audit.get_entries().await;

    if format == OutputFormat::Json {
        let report = serde_json::json!({ "result": &result, "audit": entries });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("─────────────────────────────────────────");
        if result.success {
            println!("  {} Backend answered", "✓".green());
        } else {
            println!("  {} Backend test failed", "✗".red());
        }
        if let Some(decision) = &result.decision {
            println!("  Decision:   {}", decision);
        }
        if let Some(confidence) = result.confidence {
            println!("  Confidence: {:.2}", confidence);
        }
        if let Some(comments) = &result.comments {
            println!("  Comments:   {}", comments);
        }
        println!("  Time:       {}ms", result.processing_time_ms);
        if let Some(error) = &result.error {
            println!("  {}: {}", "Error".red(), error);
        }
        for entry in &entries {
            println!(
                "  Audit:      {} by {} ({:?})",
                entry.description,
                entry.actor,
                entry.result
            );
        }
    }

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_config_show(config: AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&display_config)?);
    } else {
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        print!("{}", serde_yaml::to_string(&display_config)?);
    }

    Ok(())
}

fn cmd_config_validate(config_path: &std::path::Path, config: &AppConfig) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    if let Err(e) = AppConfig::load(config_path) {
        println!("{}: {:#}", "Configuration file error".red().bold(), e);
        std::process::exit(1);
    }

    let validation_result = ConfigValidator::validate(config);
    validation_result.print();

    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!(
        "  AI: {} ({}, model {})",
        if config.ai.enabled { "enabled" } else { "disabled" },
        config.ai.provider,
        config.ai.model
    );
    println!("  Role overrides: {}", config.roles.len());
    println!("  Log level: {}", config.logging.level);

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Configuration validation failed. Fix the errors above."
                .red()
                .bold()
        );
        std::process::exit(1);
    } else if !validation_result.warnings.is_empty() {
        println!();
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!();
        println!("{}", "Configuration is valid.".green().bold());
    }

    Ok(())
}
