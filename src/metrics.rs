use std::sync::Mutex;

use crate::protocol::ProtocolKind;

/// One observation emitted by the dispatcher. Consumed by an external
/// metrics recorder; this crate only defines the event stream.
#[derive(Clone, Debug)]
pub enum MetricsEvent {
    /// Emitted once per task when the selection policy picks a model.
    ModelSelected {
        model: String,
        tier: &'static str,
        content_chars: usize,
    },
    /// Emitted once per completed dispatch, hit or live.
    CallFinished {
        model: String,
        protocol: ProtocolKind,
        duration_ms: u64,
        cache_hit: bool,
        token_ceiling: u32,
        success: bool,
    },
}

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

/// Default sink: structured tracing events, nothing retained.
pub struct LogSink;

impl MetricsSink for LogSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ModelSelected {
                model,
                tier,
                content_chars,
            } => {
                tracing::info!(model, tier, content_chars, "model selected");
            }
            MetricsEvent::CallFinished {
                model,
                protocol,
                duration_ms,
                cache_hit,
                token_ceiling,
                success,
            } => {
                tracing::info!(
                    model,
                    protocol = protocol.as_str(),
                    duration_ms,
                    cache_hit,
                    token_ceiling,
                    success,
                    "call finished"
                );
            }
        }
    }
}

/// Test sink that retains every event for assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MetricsEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MetricsEvent> {
        self.events.lock().expect("metrics lock poisoned").clone()
    }
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.lock().expect("metrics lock poisoned").push(event);
    }
}
