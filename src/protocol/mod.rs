pub mod chat;
pub mod http;
pub mod responses;

use async_trait::async_trait;

use crate::error::ExtractError;

/// Which of the provider's two wire shapes a request uses. The two shapes
/// are not interchangeable: responses cached under one kind are never served
/// for the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolKind {
    /// Chat-completions shape: system + user message pair, JSON-only mode.
    ChatStyle,
    /// Responses shape: single input string plus separate instructions.
    ResponsesStyle,
}

impl ProtocolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatStyle => "chat",
            Self::ResponsesStyle => "responses",
        }
    }
}

/// Fully-specified provider request. Immutable once the selection policy
/// builds it for a task.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    pub model: String,
    pub protocol: ProtocolKind,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Extraction instructions. Chat-style sends these as the system
    /// message; Responses-style sends them in the dedicated field.
    pub instructions: String,
    /// Document content. Never concatenated with instructions.
    pub content: String,
}

/// The provider seam. One implementation speaks HTTP to the real provider;
/// tests script their own.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Execute one call and normalize the reply to plain text. Must enforce
    /// a hard wall-clock timeout and surface it as `ExtractError::Timeout`,
    /// distinct from rejected/malformed outcomes.
    async fn call(&self, spec: &RequestSpec) -> Result<String, ExtractError>;
}

/// Model family for breaker bookkeeping and token-field selection: the
/// first two dash-separated segments of the bare id (`gpt-5-mini` → `gpt-5`,
/// `gpt-4.1-mini` → `gpt-4.1`). Provider route prefixes are stripped first.
pub fn model_family(model: &str) -> String {
    let bare = model.rsplit('/').next().unwrap_or(model);
    let mut segments = bare.splitn(3, '-');
    match (segments.next(), segments.next()) {
        (Some(a), Some(b)) => format!("{a}-{b}"),
        (Some(a), None) => a.to_string(),
        _ => bare.to_string(),
    }
}
