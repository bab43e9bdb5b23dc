use std::time::Duration;

use crate::error::ExtractError;
use crate::protocol::{ProviderApi, RequestSpec};

/// Explicit retry policy applied by the call site: bounded attempts with
/// exponential backoff, retrying only errors the predicate accepts.
/// Protocol errors (empty/unparseable output) never retry the same model.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the given retry (1-based): base × 2^(retry-1).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }

    /// Run one provider call under this policy. `on_failure` fires once per
    /// failed attempt (the breaker counts attempts, not exhausted
    /// sequences).
    pub async fn call(
        &self,
        provider: &dyn ProviderApi,
        spec: &RequestSpec,
        mut on_failure: impl FnMut(&ExtractError),
    ) -> Result<String, ExtractError> {
        let mut attempt = 1;
        loop {
            match provider.call(spec).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    on_failure(&e);
                    if e.is_retryable() && attempt < self.max_attempts {
                        let delay = self.delay_for(attempt);
                        tracing::warn!(
                            model = spec.model,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "transient provider error, retrying: {e}"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }
}
