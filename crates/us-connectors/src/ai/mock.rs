//! Mock AI connector for testing.
//!
//! Replies are scripted per prompt substring, with optional per-reply latency
//! and failure injection. Every call is recorded for later assertions.

use super::AiProvider;
use crate::traits::{AiConnector, ConnectorError, ConnectorResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Behavior configuration for failure injection.
#[derive(Debug, Clone, Default)]
pub enum MockAiBehavior {
    /// Reply with the scripted responses.
    #[default]
    Normal,
    /// Always fail with the given error.
    AlwaysFail(ConnectorError),
    /// Fail every call whose prompt contains the pattern.
    FailOn {
        pattern: String,
        error: ConnectorError,
    },
}

#[derive(Debug, Clone)]
struct ScriptedReply {
    pattern: String,
    content: String,
    latency: Duration,
}

/// Mock AI connector.
pub struct MockAiConnector {
    name: String,
    replies: Arc<RwLock<Vec<ScriptedReply>>>,
    default_reply: Arc<RwLock<String>>,
    behavior: Arc<RwLock<MockAiBehavior>>,
    call_count: AtomicU64,
    prompts: Arc<RwLock<Vec<String>>>,
}

impl MockAiConnector {
    /// Creates a mock that approves everything.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Arc::new(RwLock::new(Vec::new())),
            default_reply: Arc::new(RwLock::new(
                r#"{"decision": "approved", "comments": "mock approval", "confidence": 0.8}"#
                    .to_string(),
            )),
            behavior: Arc::new(RwLock::new(MockAiBehavior::Normal)),
            call_count: AtomicU64::new(0),
            prompts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a mock whose every reply is `content`.
    pub fn with_reply(name: &str, content: &str) -> Self {
        let mut mock = Self::new(name);
        mock.default_reply = Arc::new(RwLock::new(content.to_string()));
        mock
    }

    /// Replies with `content` whenever the prompt contains `pattern`.
    ///
    /// The first matching pattern wins.
    pub async fn reply_when(&self, pattern: &str, content: &str) {
        self.reply_when_after(pattern, content, Duration::ZERO).await;
    }

    /// Like [`reply_when`](Self::reply_when) but sleeps for `latency` first.
    pub async fn reply_when_after(&self, pattern: &str, content: &str, latency: Duration) {
        self.replies.write().await.push(ScriptedReply {
            pattern: pattern.to_string(),
            content: content.to_string(),
            latency,
        });
    }

    pub async fn set_behavior(&self, behavior: MockAiBehavior) {
        *self.behavior.write().await = behavior;
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Returns every prompt received, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.read().await.clone()
    }
}

#[async_trait]
impl AiConnector for MockAiConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> AiProvider {
        AiProvider::OpenAiCompatible
    }

    async fn complete(&self, prompt: &str) -> ConnectorResult<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.write().await.push(prompt.to_string());

        match &*self.behavior.read().await {
            MockAiBehavior::Normal => {}
            MockAiBehavior::AlwaysFail(error) => return Err(error.clone()),
            MockAiBehavior::FailOn { pattern, error } => {
                if prompt.contains(pattern.as_str()) {
                    return Err(error.clone());
                }
            }
        }

        let scripted = self
            .replies
            .read()
            .await
            .iter()
            .find(|r| prompt.contains(r.pattern.as_str()))
            .cloned();

        match scripted {
            Some(reply) => {
                if !reply.latency.is_zero() {
                    tokio::time::sleep(reply.latency).await;
                }
                Ok(reply.content)
            }
            None => Ok(self.default_reply.read().await.clone()),
        }
    }
}
