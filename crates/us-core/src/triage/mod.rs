//! AI decision pipeline for equipment triage.
//!
//! One pass renders the prompt, calls the backend once under a timeout and
//! parses the reply. Every failure on that path is a [`PipelineError`] that
//! [`AiDecisionPipeline::process_equipment`] logs and turns into a `pending`
//! decision with zero confidence, so callers never see an error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use us_connectors::{
    parse_ai_output, render_prompt, AiConfig, AiConnector, AiOutput, ConnectorError,
    ConnectorResult, Decision, EquipmentData, HttpAiConnector, ParseError,
};
use us_observability::MetricsCollector;

/// Tagged failure of a single AI pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("{0}")]
    Backend(#[from] ConnectorError),

    #[error("AI backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Parse(#[from] ParseError),
}

impl PipelineError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Backend(e) => e.kind(),
            PipelineError::Timeout(_) => "timeout",
            PipelineError::Parse(_) => "parse",
        }
    }
}

/// Outcome of a configuration test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAiResult {
    pub success: bool,
    pub decision: Option<Decision>,
    pub comments: Option<String>,
    pub confidence: Option<f64>,
    pub processing_time_ms: u64,
    pub error: Option<String>,
}

/// Renders, dispatches and parses AI decisions for equipment records.
#[derive(Clone)]
pub struct AiDecisionPipeline {
    connector: Arc<dyn AiConnector>,
    template: String,
    timeout: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl AiDecisionPipeline {
    /// Creates a pipeline around an existing connector.
    pub fn new(
        connector: Arc<dyn AiConnector>,
        template: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            connector,
            template: template.into(),
            timeout,
            metrics: None,
        }
    }

    /// Builds an HTTP connector for `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigError` when the configuration cannot be
    /// used, e.g. a generic provider without `api_url`.
    pub fn from_config(config: &AiConfig) -> ConnectorResult<Self> {
        let connector = HttpAiConnector::new(config.clone())?;
        Ok(Self::new(Arc::new(connector), config.template(), config.timeout()))
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn connector_name(&self) -> &str {
        self.connector.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one pass and surfaces the tagged failure.
    #[instrument(skip_all, fields(connector = %self.connector.name()))]
    pub async fn try_process(&self, equipment: &EquipmentData) -> Result<AiOutput, PipelineError> {
        let prompt = render_prompt(&self.template, equipment);
        let started = Instant::now();

        let content = tokio::time::timeout(self.timeout, self.connector.complete(&prompt))
            .await
            .map_err(|_| PipelineError::Timeout(self.timeout))??;

        if let Some(ref metrics) = self.metrics {
            metrics.record_ai_latency(
                self.connector.provider().as_str(),
                started.elapsed().as_secs_f64(),
            );
        }

        let output = parse_ai_output(&content)?;
        debug!(
            decision = %output.decision,
            confidence = output.confidence,
            "AI decision parsed"
        );
        Ok(output)
    }

    /// Runs one pass. Never fails: errors become a `pending` decision.
    pub async fn process_equipment(&self, equipment: &EquipmentData) -> AiOutput {
        match self.try_process(equipment).await {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    connector = %self.connector.name(),
                    kind = e.kind(),
                    error = %e,
                    "AI processing failed, falling back to pending"
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.record_ai_failure(e.kind()).await;
                }
                AiOutput::failed(&e)
            }
        }
    }

    /// Processes every record concurrently. Results follow input order.
    ///
    /// A slow or failing record only affects its own slot.
    pub async fn process_batch(&self, items: Vec<EquipmentData>) -> Vec<AiOutput> {
        let count = items.len();
        let mut tasks = JoinSet::new();

        for (index, equipment) in items.into_iter().enumerate() {
            let pipeline = self.clone();
            tasks.spawn(async move { (index, pipeline.process_equipment(&equipment).await) });
        }

        let mut results: Vec<Option<AiOutput>> = (0..count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, output)) => results[index] = Some(output),
                Err(e) => warn!(error = %e, "AI task did not complete"),
            }
        }

        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| AiOutput::failed("task aborted")))
            .collect()
    }

    /// Builds a pipeline for `config` and runs one record through it.
    ///
    /// An unusable configuration also yields a `pending` decision.
    pub async fn process_with_config(equipment: &EquipmentData, config: &AiConfig) -> AiOutput {
        match Self::from_config(config) {
            Ok(pipeline) => pipeline.process_equipment(equipment).await,
            Err(e) => {
                warn!(provider = %config.provider, error = %e, "AI configuration rejected");
                AiOutput::failed(&e)
            }
        }
    }

    /// Runs the built-in sample record through this pipeline.
    pub async fn test_configuration(&self) -> TestAiResult {
        let started = Instant::now();
        let result = self.try_process(&sample_equipment()).await;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(output) => TestAiResult {
                success: true,
                decision: Some(output.decision),
                comments: Some(output.comments),
                confidence: Some(output.confidence),
                processing_time_ms,
                error: None,
            },
            Err(e) => TestAiResult {
                success: false,
                decision: Some(Decision::Pending),
                comments: None,
                confidence: Some(0.0),
                processing_time_ms,
                error: Some(e.to_string()),
            },
        }
    }

    /// Like [`test_configuration`](Self::test_configuration) for a raw config.
    pub async fn test_config(config: &AiConfig) -> TestAiResult {
        match Self::from_config(config) {
            Ok(pipeline) => pipeline.test_configuration().await,
            Err(e) => TestAiResult {
                success: false,
                decision: None,
                comments: None,
                confidence: None,
                processing_time_ms: 0,
                error: Some(e.to_string()),
            },
        }
    }
}

/// The record used to test an AI configuration.
pub fn sample_equipment() -> EquipmentData {
    let mut equipment = EquipmentData::from_source("test")
        .with_hostname("test-server-01")
        .with_ip_address("10.0.0.100")
        .with_os("Ubuntu Linux");
    equipment.os_version = Some("22.04".to_string());
    equipment.asset_type = Some("server".to_string());
    equipment.manufacturer = Some("Dell".to_string());
    equipment.model = Some("PowerEdge R740".to_string());
    equipment
}
