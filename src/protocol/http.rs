use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::protocol::{ProtocolKind, ProviderApi, RequestSpec, chat, responses};

/// Cap response body reads to prevent memory exhaustion on a misbehaving
/// provider.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024; // 4MB

/// Reqwest-backed provider. One client, built once, pooled.
pub struct HttpProvider {
    client: Client,
    base_url: String,
    api_key: String,
    call_timeout: Duration,
    reasoning_model: String,
    reasoning_effort: String,
}

impl HttpProvider {
    pub fn new(config: &ExtractorConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            call_timeout: config.call_timeout(),
            reasoning_model: config.reasoning_model.clone(),
            reasoning_effort: config.reasoning_effort.clone(),
        }
    }

    fn endpoint(&self, protocol: ProtocolKind) -> String {
        match protocol {
            ProtocolKind::ChatStyle => format!("{}/chat/completions", self.base_url),
            ProtocolKind::ResponsesStyle => format!("{}/responses", self.base_url),
        }
    }

    fn body_for(&self, spec: &RequestSpec) -> serde_json::Value {
        match spec.protocol {
            ProtocolKind::ChatStyle => chat::build_body(spec),
            ProtocolKind::ResponsesStyle => {
                let effort = (spec.model == self.reasoning_model)
                    .then_some(self.reasoning_effort.as_str());
                responses::build_body(spec, effort)
            }
        }
    }

    async fn send(&self, spec: &RequestSpec) -> Result<String, ExtractError> {
        let response = self
            .client
            .post(self.endpoint(spec.protocol))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.call_timeout)
            .json(&self.body_for(spec))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExtractError::RateLimited {
                provider: "openai".to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ExtractError::AuthFailed {
                provider: "openai".to_string(),
                message: format!("{status}"),
            });
        }

        // Catch-all for any non-success status. Cap error body reads the
        // same as success bodies.
        if !status.is_success() {
            let error_bytes = response.bytes().await.unwrap_or_default();
            let truncated = &error_bytes[..error_bytes.len().min(MAX_RESPONSE_BYTES)];
            let text = String::from_utf8_lossy(truncated);
            return Err(ExtractError::Upstream {
                provider: "openai".to_string(),
                message: format!("{status}: {text}"),
                status: Some(status.as_u16()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| ExtractError::Upstream {
            provider: "openai".to_string(),
            message: format!("failed to read response body: {e}"),
            status: None,
        })?;

        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(ExtractError::Upstream {
                provider: "openai".to_string(),
                message: format!(
                    "response too large: {} bytes (max {})",
                    bytes.len(),
                    MAX_RESPONSE_BYTES
                ),
                status: None,
            });
        }

        match spec.protocol {
            ProtocolKind::ChatStyle => chat::ChatReply::parse(&bytes)?.extract_text(&spec.model),
            ProtocolKind::ResponsesStyle => {
                responses::ResponsesReply::parse(&bytes)?.extract_text(&spec.model)
            }
        }
    }
}

#[async_trait]
impl ProviderApi for HttpProvider {
    async fn call(&self, spec: &RequestSpec) -> Result<String, ExtractError> {
        let start = Instant::now();

        // Outer race so a stalled connect/read still resolves as Timeout,
        // never as a generic request failure.
        let outcome = tokio::time::timeout(self.call_timeout, self.send(spec)).await;

        match outcome {
            Ok(Ok(text)) => Ok(text),
            // reqwest surfaces its per-request timeout as a request error;
            // fold it into the Timeout subtype.
            Ok(Err(e)) => {
                if matches!(&e, ExtractError::Request(inner) if inner.is_timeout()) {
                    Err(ExtractError::Timeout(start.elapsed().as_millis() as u64))
                } else {
                    Err(e)
                }
            }
            Err(_) => Err(ExtractError::Timeout(start.elapsed().as_millis() as u64)),
        }
    }
}
