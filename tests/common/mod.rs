#![allow(dead_code)] // each test binary uses a different subset

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use takeoff::config::ExtractorConfig;
use takeoff::error::ExtractError;
use takeoff::protocol::{ProviderApi, RequestSpec};

/// One scripted step for a model. When a model's script runs out, the
/// provider echoes `ok:<model>`.
#[derive(Clone)]
pub enum Scripted {
    Succeed(String),
    /// Retryable failure (upstream 503).
    FailTransient,
    /// Non-retryable protocol failure (empty reply).
    FailProtocol,
    /// Sleep, then succeed — for exercising deadlines.
    Stall(Duration),
}

/// Scripted stand-in for the HTTP provider. Records every request so tests
/// can assert call counts per model.
#[derive(Default)]
pub struct MockProvider {
    calls: Mutex<Vec<RequestSpec>>,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, model: &str, steps: Vec<Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .extend(steps);
    }

    pub fn calls(&self) -> Vec<RequestSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, model: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|spec| spec.model == model)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderApi for MockProvider {
    async fn call(&self, spec: &RequestSpec) -> Result<String, ExtractError> {
        self.calls.lock().unwrap().push(spec.clone());

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&spec.model)
            .and_then(|queue| queue.pop_front());

        match step {
            None => Ok(format!("ok:{}", spec.model)),
            Some(Scripted::Succeed(text)) => Ok(text),
            Some(Scripted::FailTransient) => Err(ExtractError::Upstream {
                provider: "mock".to_string(),
                message: "service unavailable".to_string(),
                status: Some(503),
            }),
            Some(Scripted::FailProtocol) => Err(ExtractError::EmptyResponse {
                model: spec.model.clone(),
            }),
            Some(Scripted::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(format!("late:{}", spec.model))
            }
        }
    }
}

/// Config tuned for tests: unique cache dir, instant retries, short task
/// deadline. The TempDir guard must be held for the test's duration.
pub fn test_config(cache_dir: &tempfile::TempDir) -> ExtractorConfig {
    ExtractorConfig {
        cache_dir: PathBuf::from(cache_dir.path()),
        retry_max_attempts: 1,
        retry_base_delay_ms: 1,
        breaker_threshold: 3,
        task_timeout_secs: 5,
        ..ExtractorConfig::default()
    }
}
