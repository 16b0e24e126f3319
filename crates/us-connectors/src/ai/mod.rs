//! AI backend connectors used for inventory triage.
//!
//! Each supported provider is described by an [`AiProvider`] tag. The tag
//! selects a [`provider::ProviderStrategy`] that knows the provider's default
//! endpoint, auth headers, request body and where the reply text lives.

pub mod connector;
pub mod mock;
pub mod parse;
pub mod prompt;
pub mod provider;

pub use connector::HttpAiConnector;
pub use mock::{MockAiBehavior, MockAiConnector};
pub use parse::{parse_ai_output, ParseError};
pub use prompt::{render_prompt, DEFAULT_PROMPT_TEMPLATE};
pub use provider::{strategy_for, ProviderStrategy};

use crate::secret::Secret;
use crate::traits::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Supported AI providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "groq")]
    Groq,
    #[serde(rename = "deepseek")]
    DeepSeek,
    /// Any server speaking the chat-completions dialect at a configured URL.
    #[serde(rename = "openai_compatible", alias = "generic")]
    OpenAiCompatible,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
            AiProvider::Ollama => "ollama",
            AiProvider::Groq => "groq",
            AiProvider::DeepSeek => "deepseek",
            AiProvider::OpenAiCompatible => "openai_compatible",
        }
    }

    /// Returns the endpoint used when no `api_url` is configured.
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            AiProvider::OpenAi => Some("https://api.openai.com/v1/chat/completions"),
            AiProvider::Anthropic => Some("https://api.anthropic.com/v1/complete"),
            AiProvider::Ollama => Some("http://localhost:11434/api/generate"),
            AiProvider::Groq => Some("https://api.groq.com/openai/v1/chat/completions"),
            AiProvider::DeepSeek => Some("https://api.deepseek.com/chat/completions"),
            AiProvider::OpenAiCompatible => None,
        }
    }

    /// Returns all providers.
    pub fn all() -> &'static [AiProvider] {
        &[
            AiProvider::OpenAi,
            AiProvider::Anthropic,
            AiProvider::Ollama,
            AiProvider::Groq,
            AiProvider::DeepSeek,
            AiProvider::OpenAiCompatible,
        ]
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "anthropic" => Ok(AiProvider::Anthropic),
            "ollama" => Ok(AiProvider::Ollama),
            "groq" => Ok(AiProvider::Groq),
            "deepseek" => Ok(AiProvider::DeepSeek),
            "openai_compatible" | "generic" => Ok(AiProvider::OpenAiCompatible),
            other => Err(ConnectorError::ConfigError(format!("unknown AI provider '{}'", other))),
        }
    }
}

/// Configuration for one AI backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_provider")]
    pub provider: AiProvider,
    /// Overrides the provider's default endpoint.
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
    /// Replaces the built-in prompt when set and non-empty.
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> AiProvider {
    AiProvider::OpenAi
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

impl Default for AiConfig {
    fn default() -> Self {
        Self {
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

impl AiConfig {
    pub fn new(provider: AiProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<Secret>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Resolves the URL requests are sent to.
    pub fn endpoint(&self) -> ConnectorResult<String> {
        match (&self.api_url, self.provider.default_endpoint()) {
            (Some(url), _) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            (_, Some(default)) => Ok(default.to_string()),
            _ => Err(ConnectorError::ConfigError(format!(
                "provider '{}' requires api_url",
                self.provider
            ))),
        }
    }

    /// Returns the configured template, or the built-in one.
    pub fn template(&self) -> &str {
        match self.prompt_template.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_PROMPT_TEMPLATE,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the API key when one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .map(|k| k.expose())
    }

    /// Checks the configuration for values no provider accepts.
    pub fn validate(&self) -> ConnectorResult<()> {
        self.endpoint()?;
        if self.model.trim().is_empty() {
            return Err(ConnectorError::ConfigError("model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConnectorError::ConfigError(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConnectorError::ConfigError(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
