//! Exercises the HTTP AI connector against a local fake backend.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use us_connectors::{AiConfig, AiConnector, AiProvider, ConnectorError, HttpAiConnector};

#[derive(Debug, Clone)]
struct Seen {
    headers: HeaderMap,
    body: Value,
}

type Recorder = Arc<Mutex<Vec<Seen>>>;

const DECISION: &str = r#"{"decision": "approved", "confidence": 0.9}"#;

async fn chat(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.lock().await.push(Seen { headers, body });
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": DECISION}}]
    }))
}

async fn anthropic(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.lock().await.push(Seen { headers, body });
    Json(json!({ "completion": DECISION }))
}

async fn ollama(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.lock().await.push(Seen { headers, body });
    Json(json!({ "model": "llama3", "response": DECISION, "done": true }))
}

async fn unauthorized() -> StatusCode {
    StatusCode::UNAUTHORIZED
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded")
}

async fn garbage() -> &'static str {
    "<html>not json</html>"
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "response": DECISION }))
}

async fn spawn_backend() -> (SocketAddr, Recorder) {
    let recorder: Recorder = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/v1/complete", post(anthropic))
        .route("/api/generate", post(ollama))
        .route("/unauthorized", post(unauthorized))
        .route("/broken", post(broken))
        .route("/garbage", post(garbage))
        .route("/slow", post(slow))
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, recorder)
}

fn connector(provider: AiProvider, addr: SocketAddr, path: &str) -> HttpAiConnector {
    let config =
        AiConfig::new(provider, "test-model").with_api_url(format!("http://{}{}", addr, path));
    HttpAiConnector::new(config).unwrap()
}

#[tokio::test]
async fn test_openai_style_request() {
    let (addr, recorder) = spawn_backend().await;
    let config = AiConfig::new(AiProvider::OpenAi, "gpt-4")
        .with_api_url(format!("http://{}/v1/chat/completions", addr))
        .with_api_key("sk-test");
    let connector = HttpAiConnector::new(config).unwrap();

    let content = connector.complete("classify srv1").await.unwrap();
    assert_eq!(content, DECISION);

    let seen = recorder.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].headers["authorization"], "Bearer sk-test");
    assert_eq!(seen[0].body["model"], "gpt-4");
    assert_eq!(seen[0].body["messages"][0]["content"], "classify srv1");
    assert_eq!(seen[0].body["max_tokens"], 1000);
}

#[tokio::test]
async fn test_compatible_provider_without_key() {
    let (addr, recorder) = spawn_backend().await;
    let connector = connector(AiProvider::OpenAiCompatible, addr, "/v1/chat/completions");

    connector.complete("hello").await.unwrap();

    let seen = recorder.lock().await;
    assert!(seen[0].headers.get("authorization").is_none());
    assert!(seen[0].body.get("max_tokens").is_none());
}

#[tokio::test]
async fn test_anthropic_request() {
    let (addr, recorder) = spawn_backend().await;
    let config = AiConfig::new(AiProvider::Anthropic, "claude-2")
        .with_api_url(format!("http://{}/v1/complete", addr))
        .with_api_key("ak-test");
    let connector = HttpAiConnector::new(config).unwrap();

    assert_eq!(connector.complete("p").await.unwrap(), DECISION);

    let seen = recorder.lock().await;
    assert_eq!(seen[0].headers["x-api-key"], "ak-test");
    assert_eq!(seen[0].headers["anthropic-version"], "2023-06-01");
    assert_eq!(seen[0].body["prompt"], "\n\nHuman: p\n\nAssistant:");
}

#[tokio::test]
async fn test_ollama_request() {
    let (addr, recorder) = spawn_backend().await;
    let connector = connector(AiProvider::Ollama, addr, "/api/generate");

    assert_eq!(connector.complete("p").await.unwrap(), DECISION);

    let seen = recorder.lock().await;
    assert_eq!(seen[0].body["stream"], false);
    assert_eq!(seen[0].body["options"]["temperature"], 0.3);
}

#[tokio::test]
async fn test_error_statuses_are_mapped() {
    let (addr, _) = spawn_backend().await;

    let err = connector(AiProvider::Groq, addr, "/unauthorized")
        .complete("p")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::AuthenticationFailed(_)));

    let err = connector(AiProvider::Groq, addr, "/broken")
        .complete("p")
        .await
        .unwrap_err();
    match err {
        ConnectorError::RequestFailed(msg) => assert!(msg.contains("model overloaded")),
        other => panic!("unexpected error: {:?}", other),
    }

    let err = connector(AiProvider::Groq, addr, "/garbage")
        .complete("p")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_missing_content_field() {
    let (addr, _) = spawn_backend().await;
    // Ollama replies have no `choices` array.
    let err = connector(AiProvider::DeepSeek, addr, "/api/generate")
        .complete("p")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let (addr, _) = spawn_backend().await;
    let config = AiConfig::new(AiProvider::Ollama, "llama3")
        .with_api_url(format!("http://{}/slow", addr))
        .with_timeout_secs(1);
    let connector = HttpAiConnector::new(config).unwrap();

    let err = connector.complete("p").await.unwrap_err();
    assert!(matches!(err, ConnectorError::Timeout(_)));
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = connector(AiProvider::Ollama, addr, "/api/generate")
        .complete("p")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::ConnectionFailed(_)));
}
