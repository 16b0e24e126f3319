//! # us-connectors
//!
//! AI backend connectors for UnderSight inventory triage.
//!
//! This crate provides the [`AiConnector`] trait, an HTTP implementation that
//! speaks the OpenAI, Anthropic, Ollama, Groq, DeepSeek and generic
//! chat-completions dialects, prompt rendering, reply parsing and a mock
//! connector for tests.

pub mod ai;
pub mod http;
pub mod secret;
pub mod traits;

pub use ai::{
    parse_ai_output, render_prompt, AiConfig, AiProvider, HttpAiConnector, MockAiBehavior,
    MockAiConnector, ParseError, DEFAULT_PROMPT_TEMPLATE,
};
pub use secret::Secret;
pub use traits::{
    AiConnector, AiOutput, ConnectorError, ConnectorResult, Decision, EquipmentData,
};
