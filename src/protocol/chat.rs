use serde::Deserialize;

use crate::error::ExtractError;
use crate::protocol::{RequestSpec, model_family};

/// Families that renamed the token-limit field. Everything else still takes
/// `max_tokens`.
const COMPLETION_TOKENS_FAMILIES: &[&str] = &["gpt-5", "o3", "o4"];

/// Name of the token-limit field for this model. Chosen per model at
/// request-build time; the provider rejects requests using the wrong name.
pub fn token_limit_field(model: &str) -> &'static str {
    let family = model_family(model);
    if COMPLETION_TOKENS_FAMILIES.iter().any(|f| {
        family == *f || family.starts_with(&format!("{f}-")) || family.starts_with(&format!("{f}."))
    }) {
        "max_completion_tokens"
    } else {
        "max_tokens"
    }
}

/// Chat-completions request body: system + user message pair, JSON-only
/// response mode.
pub fn build_body(spec: &RequestSpec) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": spec.model,
        "messages": [
            {"role": "system", "content": spec.instructions},
            {"role": "user", "content": spec.content},
        ],
        "temperature": spec.temperature,
        "response_format": {"type": "json_object"},
    });
    body[token_limit_field(&spec.model)] = serde_json::json!(spec.max_output_tokens);
    body
}

#[derive(Deserialize)]
pub struct ChatReply {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl ChatReply {
    pub fn parse(bytes: &[u8]) -> Result<Self, ExtractError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ExtractError::SchemaParse(format!("chat reply: {e}")))
    }

    /// Normalize to plain text: first choice's message content, non-empty.
    pub fn extract_text(self, model: &str) -> Result<String, ExtractError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ExtractError::EmptyResponse {
                model: model.to_string(),
            })
    }
}
