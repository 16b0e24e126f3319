//! HTTP utilities for AI connectors.
//!
//! Requests are sent exactly once. Callers own timeouts and fallbacks.

use crate::traits::{ConnectorError, ConnectorResult};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Upper bound on how much of an error body ends up in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Thin single-attempt JSON client.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> ConnectorResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ConnectorError::ConfigError(e.to_string()))?;

        Ok(Self { client })
    }

    /// POSTs `body` as JSON and decodes the JSON reply.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &T,
    ) -> ConnectorResult<Value> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        debug!(url = %url, "Sending AI request");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ConnectorError::Timeout(e.to_string())
            } else if e.is_connect() {
                ConnectorError::ConnectionFailed(e.to_string())
            } else {
                ConnectorError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ConnectorError::RateLimited(retry_after));
        }

        match status {
            StatusCode::UNAUTHORIZED => {
                return Err(ConnectorError::AuthenticationFailed("Unauthorized".into()))
            }
            StatusCode::FORBIDDEN => {
                return Err(ConnectorError::AuthenticationFailed("Forbidden".into()))
            }
            _ => {}
        }

        let text = response
            .text()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(ConnectorError::RequestFailed(format!(
                "HTTP {}: {}",
                status,
                truncate(&text)
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            ConnectorError::InvalidResponse(format!(
                "Failed to parse response (status {}): {} - Body: {}",
                status,
                e,
                truncate(&text)
            ))
        })
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(HttpClient::new(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let err = client
            .post_json(&format!("http://{}/chat", addr), &[], &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ConnectionFailed(_)));
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(2000);
        assert_eq!(truncate(&body).len(), MAX_ERROR_BODY);
        assert_eq!(truncate("short"), "short");
    }
}
