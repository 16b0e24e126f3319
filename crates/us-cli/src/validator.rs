//! Configuration validation for UnderSight.

use crate::config::AppConfig;
use colored::Colorize;
use serde::Serialize;
use us_connectors::AiProvider;
use us_core::auth::Permission;

/// Result of configuration validation.
#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    /// Problems that make the configuration unusable.
    pub errors: Vec<String>,
    /// Problems worth fixing that do not block use.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Checks a loaded configuration for values the runtime would reject.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        Self::validate_ai(config, &mut result);
        Self::validate_roles(config, &mut result);
        Self::validate_logging(config, &mut result);
        result
    }

    fn validate_ai(config: &AppConfig, result: &mut ValidationResult) {
        let ai = &config.ai;

        let provider: AiProvider = match ai.provider.parse() {
            Ok(provider) => provider,
            Err(_) => {
                let known: Vec<&str> = AiProvider::all().iter().map(|p| p.as_str()).collect();
                result.add_error(format!(
                    "ai.provider '{}' is not one of: {}",
                    ai.provider,
                    known.join(", ")
                ));
                return;
            }
        };

        if !(0.0..=2.0).contains(&ai.temperature) {
            result.add_error(format!("ai.temperature {} is outside 0.0..=2.0", ai.temperature));
        }
        if ai.timeout_secs == 0 {
            result.add_error("ai.timeout_secs must be greater than zero");
        }
        if ai.model.trim().is_empty() {
            result.add_error("ai.model must not be empty");
        }
        if provider == AiProvider::OpenAiCompatible
            && ai.api_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            result.add_error("ai.api_url is required for the openai_compatible provider");
        }

        let needs_key = !matches!(provider, AiProvider::Ollama | AiProvider::OpenAiCompatible);
        let has_key = ai.api_key.as_ref().is_some_and(|k| !k.is_empty());
        if ai.enabled && needs_key && !has_key {
            result.add_warning(format!(
                "ai.api_key is empty; the {} backend will reject requests",
                provider
            ));
        }
        if !ai.enabled {
            result.add_warning("AI is disabled; received equipment is auto-approved");
        }
    }

    fn validate_roles(config: &AppConfig, result: &mut ValidationResult) {
        for (role, names) in &config.roles {
            for name in names {
                if name.parse::<Permission>().is_err() {
                    result.add_error(format!("roles.{}: unknown permission '{}'", role, name));
                }
            }
            if names.is_empty() {
                result.add_warning(format!("roles.{} grants no permissions", role));
            }
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if config.logging.level.parse::<tracing::Level>().is_err() {
            result.add_error(format!(
                "logging.level '{}' is not one of: trace, debug, info, warn, error",
                config.logging.level
            ));
        }
    }
}
