use serde::Deserialize;

use crate::error::ExtractError;
use crate::protocol::RequestSpec;

/// Responses-API request body: single input string plus a separate
/// instructions field. The two are never concatenated — the split shape is
/// what the provider tunes for, and collapsing it degrades output quality.
///
/// `reasoning_effort` is attached only when the caller decided this model
/// takes it (one configured model id, nothing else).
pub fn build_body(spec: &RequestSpec, reasoning_effort: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": spec.model,
        "input": spec.content,
        "instructions": spec.instructions,
        "temperature": spec.temperature,
        "max_output_tokens": spec.max_output_tokens,
    });
    if let Some(effort) = reasoning_effort {
        body["reasoning"] = serde_json::json!({"effort": effort});
    }
    body
}

#[derive(Deserialize)]
pub struct ResponsesReply {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesReply {
    pub fn parse(bytes: &[u8]) -> Result<Self, ExtractError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ExtractError::SchemaParse(format!("responses reply: {e}")))
    }

    /// Normalize to plain text. The aggregate `output_text` field is
    /// authoritative when present; some replies leave it empty and only
    /// carry text inside nested content blocks, so walk those before
    /// declaring the reply empty.
    pub fn extract_text(self, model: &str) -> Result<String, ExtractError> {
        if let Some(text) = self.output_text
            && !text.trim().is_empty()
        {
            return Ok(text);
        }

        let mut pieces = Vec::new();
        for item in self.output {
            for block in item.content {
                if block.kind == "output_text"
                    && let Some(text) = block.text
                    && !text.is_empty()
                {
                    pieces.push(text);
                }
            }
        }

        let joined = pieces.join("");
        if joined.trim().is_empty() {
            return Err(ExtractError::EmptyResponse {
                model: model.to_string(),
            });
        }
        Ok(joined)
    }
}
