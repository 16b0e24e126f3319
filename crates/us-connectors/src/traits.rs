//! Connector trait definitions for UnderSight.
//!
//! This module defines the interface every AI backend connector implements,
//! together with the equipment and decision types that flow through it.

use crate::ai::AiProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur in connectors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectorError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl ConnectorError {
    /// Short, stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorError::AuthenticationFailed(_) => "authentication",
            ConnectorError::ConnectionFailed(_) => "connection",
            ConnectorError::RequestFailed(_) => "request",
            ConnectorError::RateLimited(_) => "rate_limited",
            ConnectorError::InvalidResponse(_) => "invalid_response",
            ConnectorError::ConfigError(_) => "config",
            ConnectorError::Timeout(_) => "timeout",
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// An AI backend able to complete a single prompt.
///
/// Implementations perform exactly one attempt per call. Timeouts and the
/// conversion of failures into a `pending` decision belong to the caller.
#[async_trait]
pub trait AiConnector: Send + Sync {
    /// Returns the connector name used in logs.
    fn name(&self) -> &str;

    /// Returns the provider this connector talks to.
    fn provider(&self) -> AiProvider;

    /// Sends the prompt and returns the raw text content of the reply.
    async fn complete(&self, prompt: &str) -> ConnectorResult<String>;
}

/// Equipment record received from an inventory feed.
///
/// Every field except `source` is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentData {
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
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    /// Where the record came from.
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "n8n".to_string()
}

impl Default for EquipmentData {
    fn default() -> Self {
        Self {
            external_id: None,
            hostname: None,
            ip_address: None,
            mac_address: None,
            os: None,
            os_version: None,
            asset_type: None,
            manufacturer: None,
            model: None,
            serial_number: None,
            location: None,
            department: None,
            owner: None,
            tags: Vec::new(),
            metadata: HashMap::new(),
            source: default_source(),
        }
    }
}

impl EquipmentData {
    /// Creates an empty record from the given source.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Triage outcome proposed by an AI backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
    Pending,
    /// Needs a human look; inventory keeps the item pending.
    Flag,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
            Decision::Pending => "pending",
            Decision::Flag => "flag",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            "pending" => Ok(Decision::Pending),
            "flag" => Ok(Decision::Flag),
            other => Err(format!("unknown decision '{}'", other)),
        }
    }
}

/// Structured result of one AI triage pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiOutput {
    pub decision: Decision,
    pub comments: String,
    /// Confidence in the decision (0.0 - 1.0).
    pub confidence: f64,
    pub suggested_tags: Vec<String>,
    /// Suggested risk score (0-100).
    pub suggested_risk_score: u32,
    pub suggested_asset_type: Option<String>,
}

impl AiOutput {
    /// The result returned whenever the backend call or parsing fails.
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self {
            decision: Decision::Pending,
            comments: format!("AI processing failed: {}", reason),
            confidence: 0.0,
            suggested_tags: Vec::new(),
            suggested_risk_score: 0,
            suggested_asset_type: None,
        }
    }
}
