use std::sync::Arc;
use std::time::Instant;

use crate::breaker::CircuitBreaker;
use crate::cache::{CacheKey, DiskCache};
use crate::config::{DocClass, ExtractorConfig};
use crate::dispatch::retry::RetryPolicy;
use crate::dispatch::tiers::{self, Tier};
use crate::error::ExtractError;
use crate::metrics::{MetricsEvent, MetricsSink};
use crate::protocol::{ProtocolKind, ProviderApi, RequestSpec, model_family};

/// A successful extraction, live or cached.
#[derive(Debug)]
pub struct Extraction {
    pub text: String,
    pub model: String,
    pub protocol: ProtocolKind,
    pub tier: Tier,
    pub cache_hit: bool,
    pub call_ms: u64,
}

/// Chooses a model and protocol for each document, then executes the call
/// behind the cache, the circuit breaker, and the fallback chain. Shared by
/// every worker; all mutable state lives in the breaker and cache.
pub struct Dispatcher {
    config: ExtractorConfig,
    provider: Arc<dyn ProviderApi>,
    cache: DiskCache,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    metrics: Arc<dyn MetricsSink>,
}

impl Dispatcher {
    pub fn new(
        config: ExtractorConfig,
        provider: Arc<dyn ProviderApi>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let cache = DiskCache::new(config.cache_dir.clone(), config.cache_ttl());
        let breaker = CircuitBreaker::new(config.breaker_threshold);
        let retry = RetryPolicy::new(
            config.retry_max_attempts,
            std::time::Duration::from_millis(config.retry_base_delay_ms),
        );
        Self {
            config,
            provider,
            cache,
            breaker,
            retry,
            metrics,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Extract structured text for one document. Tries, in order: cache,
    /// primary model (unless its family's circuit is open), then each
    /// fallback model chat-style. Errors here are per-task; the worker
    /// boundary converts them into a failed result.
    pub async fn extract(
        &self,
        content: &str,
        class: DocClass,
        identity: &str,
    ) -> Result<Extraction, ExtractError> {
        let (spec, tier) = tiers::select(content, class, &self.config);
        self.metrics.record(MetricsEvent::ModelSelected {
            model: spec.model.clone(),
            tier: tier.as_str(),
            content_chars: content.chars().count(),
        });

        let start = Instant::now();
        let key = CacheKey::for_spec(&spec);
        if let Some(text) = self.cache.get(&key).await {
            tracing::debug!(identity, model = spec.model, "cache hit");
            self.emit_finished(&spec, start.elapsed().as_millis() as u64, true, true);
            return Ok(Extraction {
                text,
                model: spec.model,
                protocol: spec.protocol,
                tier,
                cache_hit: true,
                call_ms: 0,
            });
        }

        let family = model_family(&spec.model);
        let primary_error = if self.breaker.is_open(&family) {
            // Internal fast-fail only; never surfaced to the caller.
            tracing::warn!(identity, family, "circuit open, skipping primary");
            ExtractError::CircuitOpen { family }
        } else {
            let attempt = self
                .retry
                .call(self.provider.as_ref(), &spec, |_| {
                    self.breaker.record_failure(&family);
                })
                .await;
            match attempt {
                Ok(text) => {
                    self.breaker.record_success(&family);
                    self.cache.put(&key, &text).await;
                    let call_ms = start.elapsed().as_millis() as u64;
                    self.emit_finished(&spec, call_ms, false, true);
                    return Ok(Extraction {
                        text,
                        model: spec.model,
                        protocol: spec.protocol,
                        tier,
                        cache_hit: false,
                        call_ms,
                    });
                }
                Err(e) => {
                    self.emit_finished(&spec, start.elapsed().as_millis() as u64, false, false);
                    tracing::warn!(
                        identity,
                        model = spec.model,
                        error = e.classification(),
                        "primary model failed: {e}"
                    );
                    e
                }
            }
        };

        self.walk_fallbacks(&spec, tier, identity, primary_error).await
    }

    /// Try each backup model in order, chat-style only. First success is
    /// cached under its own fingerprint and returned.
    async fn walk_fallbacks(
        &self,
        primary: &RequestSpec,
        tier: Tier,
        identity: &str,
        mut last: ExtractError,
    ) -> Result<Extraction, ExtractError> {
        for model in &self.config.fallback_chain {
            let spec = RequestSpec {
                model: model.clone(),
                protocol: ProtocolKind::ChatStyle,
                temperature: primary.temperature,
                max_output_tokens: primary.max_output_tokens,
                instructions: primary.instructions.clone(),
                content: primary.content.clone(),
            };
            let family = model_family(model);
            let start = Instant::now();

            let key = CacheKey::for_spec(&spec);
            if let Some(text) = self.cache.get(&key).await {
                tracing::debug!(identity, model, "fallback cache hit");
                self.emit_finished(&spec, start.elapsed().as_millis() as u64, true, true);
                return Ok(Extraction {
                    text,
                    model: spec.model,
                    protocol: spec.protocol,
                    tier,
                    cache_hit: true,
                    call_ms: 0,
                });
            }

            let attempt = self
                .retry
                .call(self.provider.as_ref(), &spec, |_| {
                    self.breaker.record_failure(&family);
                })
                .await;
            match attempt {
                Ok(text) => {
                    self.breaker.record_success(&family);
                    self.cache.put(&key, &text).await;
                    let call_ms = start.elapsed().as_millis() as u64;
                    tracing::info!(identity, model, "fallback succeeded");
                    self.emit_finished(&spec, call_ms, false, true);
                    return Ok(Extraction {
                        text,
                        model: spec.model,
                        protocol: spec.protocol,
                        tier,
                        cache_hit: false,
                        call_ms,
                    });
                }
                Err(e) => {
                    self.emit_finished(&spec, start.elapsed().as_millis() as u64, false, false);
                    tracing::warn!(
                        identity,
                        model,
                        error = e.classification(),
                        "fallback failed: {e}"
                    );
                    last = e;
                }
            }
        }

        Err(ExtractError::FallbackExhausted {
            identity: identity.to_string(),
            last: last.to_string(),
        })
    }

    fn emit_finished(&self, spec: &RequestSpec, duration_ms: u64, cache_hit: bool, success: bool) {
        self.metrics.record(MetricsEvent::CallFinished {
            model: spec.model.clone(),
            protocol: spec.protocol,
            duration_ms,
            cache_hit,
            token_ceiling: spec.max_output_tokens,
            success,
        });
    }
}
