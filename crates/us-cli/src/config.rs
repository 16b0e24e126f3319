//! Configuration loading for the UnderSight CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use us_connectors::{AiConfig, AiProvider, Secret};
use us_core::auth::PermissionRegistry;

const REDACTED: &str = "***REDACTED***";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// AI backend used for inventory triage.
    #[serde(default)]
    pub ai: AiSection,

    /// Role overrides: role name to permission strings. Replaces the built-in
    /// set for `admin`, `analyst` and `viewer`; any other name adds a role.
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file is absent.
    ///
    /// An explicit path must load. A default path that exists but fails to
    /// load still yields defaults, with the error handed back for reporting.
    pub fn load_or_default(path: &Path, explicit: bool) -> Result<(Self, Option<anyhow::Error>)> {
        match Self::load(path) {
            Ok(config) => Ok((config, None)),
            Err(e) if explicit => Err(e),
            Err(_) if !path.exists() => Ok((Self::default(), None)),
            Err(e) => Ok((Self::default(), Some(e))),
        }
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if config.ai.api_key.as_ref().is_some_and(|k| !k.is_empty()) {
            config.ai.api_key = Some(Secret::from(REDACTED));
        }
        config
    }

    /// Builds the permission registry with the configured overrides applied.
    pub fn permission_registry(&self) -> Result<PermissionRegistry> {
        PermissionRegistry::new()
            .with_overrides(
                self.roles
                    .iter()
                    .map(|(role, names)| (role.as_str(), names.as_slice())),
            )
            .map_err(anyhow::Error::msg)
            .context("Invalid role override in configuration")
    }
}

/// The `ai` section.
///
/// The provider stays a string here so validation can report an unknown
/// name instead of failing the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSection {
    /// Whether received equipment goes through the AI backend.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<Secret>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub prompt_template: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_url: None,
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            prompt_template: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiSection {
    /// Converts the section into a connector configuration.
    pub fn to_ai_config(&self) -> Result<AiConfig> {
        let provider: AiProvider = self
            .provider
            .parse()
            .context("Invalid AI provider in configuration")?;

        Ok(AiConfig {
            provider,
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            prompt_template: self.prompt_template.clone(),
            timeout_secs: self.timeout_secs,
        })
    }
}

/// The `logging` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to use JSON format.
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}
