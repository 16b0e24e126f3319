//! Extraction of a structured decision from free-form model output.

use crate::traits::{AiOutput, Decision};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a model reply could not be turned into an [`AiOutput`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Parses the outermost `{ ... }` span of `content`.
///
/// Missing fields take defaults (pending, empty comments, confidence 0.5,
/// no tags, risk 0). Confidence is clamped to `[0, 1]` and risk to `[0, 100]`.
pub fn parse_ai_output(content: &str) -> Result<AiOutput, ParseError> {
    let start = content.find('{').ok_or(ParseError::NoJsonObject)?;
    let end = content.rfind('}').ok_or(ParseError::NoJsonObject)?;
    if end < start {
        return Err(ParseError::NoJsonObject);
    }

    let value: Value = serde_json::from_str(&content[start..=end])
        .map_err(|e| ParseError::MalformedJson(e.to_string()))?;
    let obj = value.as_object().ok_or_else(|| {
        ParseError::MalformedJson("top-level value is not an object".to_string())
    })?;

    let decision = match present(obj, "decision") {
        None => Decision::Pending,
        Some(Value::String(s)) => s.parse().map_err(|reason| ParseError::InvalidField {
            field: "decision",
            reason,
        })?,
        Some(other) => return Err(wrong_type("decision", "a string", other)),
    };

    let comments = match present(obj, "comments") {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => return Err(wrong_type("comments", "a string", other)),
    };

    let confidence = number_field(obj, "confidence")?
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let suggested_risk_score = number_field(obj, "suggested_risk_score")?
        .unwrap_or(0.0)
        .clamp(0.0, 100.0)
        .round() as u32;

    let suggested_tags = match present(obj, "suggested_tags") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(other) => return Err(wrong_type("suggested_tags", "an array", other)),
    };

    let suggested_asset_type = match present(obj, "suggested_asset_type") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    };

    Ok(AiOutput {
        decision,
        comments,
        confidence,
        suggested_tags,
        suggested_risk_score,
        suggested_asset_type,
    })
}

/// Returns the field unless it is absent or `null`.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn number_field(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, ParseError> {
    let number = match present(obj, field) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        // Some models quote numbers.
        Some(Value::String(s)) => {
            let parsed = s.trim().parse::<f64>();
            Some(parsed.map_err(|e| ParseError::InvalidField {
                field,
                reason: e.to_string(),
            })?)
        }
        Some(other) => return Err(wrong_type(field, "a number", other)),
    };

    match number {
        Some(n) if !n.is_finite() => Err(ParseError::InvalidField {
            field,
            reason: format!("{} is not a finite number", n),
        }),
        n => Ok(n),
    }
}

fn wrong_type(field: &'static str, expected: &str, got: &Value) -> ParseError {
    ParseError::InvalidField {
        field,
        reason: format!("expected {}, got {}", expected, got),
    }
}
