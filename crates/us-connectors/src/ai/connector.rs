//! HTTP-backed AI connector.

use super::provider::{strategy_for, ProviderStrategy};
use super::{AiConfig, AiProvider};
use crate::http::HttpClient;
use crate::traits::{AiConnector, ConnectorResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Connector that sends prompts to a real AI backend.
#[derive(Clone)]
pub struct HttpAiConnector {
    name: String,
    config: AiConfig,
    endpoint: String,
    client: HttpClient,
    strategy: Arc<dyn ProviderStrategy>,
}

impl HttpAiConnector {
    /// Validates the configuration and builds a connector for it.
    pub fn new(config: AiConfig) -> ConnectorResult<Self> {
        config.validate()?;
        let endpoint = config.endpoint()?;
        let client = HttpClient::new(config.timeout())?;
        let strategy: Arc<dyn ProviderStrategy> = Arc::from(strategy_for(config.provider));

        Ok(Self {
            name: format!("{}:{}", config.provider, config.model),
            config,
            endpoint,
            client,
            strategy,
        })
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AiConnector for HttpAiConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> AiProvider {
        self.config.provider
    }

    #[instrument(skip(self, prompt), fields(connector = %self.name))]
    async fn complete(&self, prompt: &str) -> ConnectorResult<String> {
        let body = self.strategy.build_request(&self.config, prompt);
        let headers = self.strategy.headers(self.config.api_key());

        let reply = self
            .client
            .post_json(&self.endpoint, &headers, &body)
            .await?;
        let content = self.strategy.extract_content(&reply)?;

        debug!(chars = content.len(), "AI backend replied");
        Ok(content)
    }
}
