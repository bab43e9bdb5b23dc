use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("upstream error from {provider}: {message}")]
    Upstream {
        provider: String,
        message: String,
        status: Option<u16>,
    },

    #[error("auth failed for {provider}: {message}")]
    AuthFailed { provider: String, message: String },

    #[error("empty response from model {model}")]
    EmptyResponse { model: String },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("circuit open for family {family}")]
    CircuitOpen { family: String },

    #[error("all fallbacks exhausted for {identity} (last error: {last})")]
    FallbackExhausted { identity: String, last: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl ExtractError {
    /// Returns true for transient errors worth retrying against the same model.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Timeout(_) => true,
            Self::Upstream { status, .. } => {
                // 5xx = server error (retryable), 4xx = client error (not retryable)
                // status: None = ambiguous (not from HTTP) → safe default: NOT retryable
                status.is_some_and(|s| s >= 500)
            }
            Self::Request(_) => true, // connection errors may be transient
            _ => false,
        }
    }

    /// Returns true for malformed/empty provider output. These are never
    /// retried against the same model; the dispatcher goes straight to the
    /// fallback chain instead.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::EmptyResponse { .. } | Self::SchemaParse(_))
    }

    /// Short classification tag for result records and metrics.
    pub fn classification(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::Upstream { .. } => "upstream",
            Self::AuthFailed { .. } => "auth",
            Self::EmptyResponse { .. } => "empty_response",
            Self::SchemaParse(_) => "schema_parse",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::FallbackExhausted { .. } => "fallback_exhausted",
            Self::Request(_) => "request",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_hundreds_are_retryable_four_hundreds_are_not() {
        let server = ExtractError::Upstream {
            provider: "openai".into(),
            message: "boom".into(),
            status: Some(503),
        };
        assert!(server.is_retryable());

        let client = ExtractError::Upstream {
            provider: "openai".into(),
            message: "bad request".into(),
            status: Some(400),
        };
        assert!(!client.is_retryable());

        let ambiguous = ExtractError::Upstream {
            provider: "openai".into(),
            message: "??".into(),
            status: None,
        };
        assert!(!ambiguous.is_retryable());
    }

    #[test]
    fn protocol_errors_are_not_retryable() {
        let empty = ExtractError::EmptyResponse {
            model: "gpt-5".into(),
        };
        assert!(empty.is_protocol_error());
        assert!(!empty.is_retryable());

        let parse = ExtractError::SchemaParse("unexpected token".into());
        assert!(parse.is_protocol_error());
        assert!(!parse.is_retryable());
    }

    #[test]
    fn timeout_is_transient_with_its_own_classification() {
        let e = ExtractError::Timeout(1200);
        assert!(e.is_retryable());
        assert!(!e.is_protocol_error());
        assert_eq!(e.classification(), "timeout");
    }
}
