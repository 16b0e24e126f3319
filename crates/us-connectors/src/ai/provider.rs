//! Per-provider request and response shapes.

use super::{AiConfig, AiProvider};
use crate::traits::{ConnectorError, ConnectorResult};
use serde_json::{json, Value};

/// How to talk to one family of AI backends.
pub trait ProviderStrategy: Send + Sync {
    /// Extra headers for the request, beyond `Content-Type`.
    fn headers(&self, api_key: Option<&str>) -> Vec<(&'static str, String)>;

    /// Builds the JSON request body.
    fn build_request(&self, config: &AiConfig, prompt: &str) -> Value;

    /// Pulls the generated text out of a decoded response body.
    fn extract_content(&self, body: &Value) -> ConnectorResult<String>;
}

/// Returns the strategy for a provider.
pub fn strategy_for(provider: AiProvider) -> Box<dyn ProviderStrategy> {
    match provider {
        AiProvider::OpenAi | AiProvider::Groq | AiProvider::DeepSeek => {
            Box::new(ChatCompletions {
                include_max_tokens: true,
            })
        }
        AiProvider::OpenAiCompatible => Box::new(ChatCompletions {
            include_max_tokens: false,
        }),
        AiProvider::Anthropic => Box::new(AnthropicComplete),
        AiProvider::Ollama => Box::new(OllamaGenerate),
    }
}

fn bearer(api_key: Option<&str>) -> Vec<(&'static str, String)> {
    api_key
        .map(|key| vec![("Authorization", format!("Bearer {}", key))])
        .unwrap_or_default()
}

fn missing(field: &str) -> ConnectorError {
    ConnectorError::InvalidResponse(format!("response has no '{}' field", field))
}

/// OpenAI-style `chat/completions`.
pub struct ChatCompletions {
    include_max_tokens: bool,
}

impl ProviderStrategy for ChatCompletions {
    fn headers(&self, api_key: Option<&str>) -> Vec<(&'static str, String)> {
        bearer(api_key)
    }

    fn build_request(&self, config: &AiConfig, prompt: &str) -> Value {
        let mut body = json!({
            "model": config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": config.temperature,
        });
        if self.include_max_tokens {
            body["max_tokens"] = json!(config.max_tokens);
        }
        body
    }

    fn extract_content(&self, body: &Value) -> ConnectorResult<String> {
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing("choices[0].message.content"))
    }
}

/// Anthropic legacy text completion.
pub struct AnthropicComplete;

impl ProviderStrategy for AnthropicComplete {
    fn headers(&self, api_key: Option<&str>) -> Vec<(&'static str, String)> {
        let mut headers = vec![("anthropic-version", "2023-06-01".to_string())];
        if let Some(key) = api_key {
            headers.push(("x-api-key", key.to_string()));
        }
        headers
    }

    fn build_request(&self, config: &AiConfig, prompt: &str) -> Value {
        json!({
            "model": config.model,
            "prompt": format!("\n\nHuman: {}\n\nAssistant:", prompt),
            "temperature": config.temperature,
            "max_tokens_to_sample": config.max_tokens,
        })
    }

    fn extract_content(&self, body: &Value) -> ConnectorResult<String> {
        body.get("completion")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing("completion"))
    }
}

/// Ollama `api/generate` without streaming.
pub struct OllamaGenerate;

impl ProviderStrategy for OllamaGenerate {
    fn headers(&self, _api_key: Option<&str>) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn build_request(&self, config: &AiConfig, prompt: &str) -> Value {
        json!({
            "model": config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": config.temperature,
                "num_predict": config.max_tokens,
            },
        })
    }

    fn extract_content(&self, body: &Value) -> ConnectorResult<String> {
        body.get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing("response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_body_and_auth() {
        let config = AiConfig::new(AiProvider::DeepSeek, "deepseek-chat");
        let strategy = strategy_for(AiProvider::DeepSeek);

        let body = strategy.build_request(&config, "hi");
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["max_tokens"], 1000);

        let headers = strategy.headers(Some("k"));
        assert_eq!(headers, vec![("Authorization", "Bearer k".to_string())]);
    }

    #[test]
    fn test_compatible_body_omits_max_tokens() {
        let config = AiConfig::new(AiProvider::OpenAiCompatible, "local");
        let strategy = strategy_for(AiProvider::OpenAiCompatible);

        let body = strategy.build_request(&config, "hi");
        assert!(body.get("max_tokens").is_none());
        assert!(strategy.headers(None).is_empty());
    }

    #[test]
    fn test_anthropic_shape() {
        let config = AiConfig::new(AiProvider::Anthropic, "claude-2");
        let strategy = strategy_for(AiProvider::Anthropic);

        let body = strategy.build_request(&config, "rate this");
        assert_eq!(body["prompt"], "\n\nHuman: rate this\n\nAssistant:");
        assert_eq!(body["max_tokens_to_sample"], 1000);

        let headers = strategy.headers(Some("k"));
        assert!(headers.contains(&("x-api-key", "k".to_string())));
        assert!(headers.contains(&("anthropic-version", "2023-06-01".to_string())));

        let content = strategy
            .extract_content(&json!({"completion": " {\"decision\":\"flag\"}"}))
            .unwrap();
        assert_eq!(content, " {\"decision\":\"flag\"}");
    }

    #[test]
    fn test_ollama_shape() {
        let config = AiConfig::new(AiProvider::Ollama, "llama3");
        let strategy = strategy_for(AiProvider::Ollama);

        let body = strategy.build_request(&config, "p");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 1000);
        assert!(strategy.headers(Some("ignored")).is_empty());

        let reply = json!({"response": "{}"});
        let content = strategy.extract_content(&reply).unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn test_missing_content_is_invalid_response() {
        let strategy = strategy_for(AiProvider::OpenAi);
        let reply = json!({"choices": []});
        let err = strategy.extract_content(&reply).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidResponse(_)));
    }
}
