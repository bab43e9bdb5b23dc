use std::collections::HashMap;
use std::sync::Mutex;

/// Per-model-family consecutive-failure gate, shared by every worker for
/// the duration of a run. Open means the primary path for that family is
/// bypassed entirely; any success for the family closes it again.
///
/// Counters are mutated only inside a non-suspending critical section — a
/// read-then-later-write across an await point would race under
/// cooperative scheduling.
pub struct CircuitBreaker {
    threshold: u32,
    failures: Mutex<HashMap<String, u32>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_open(&self, family: &str) -> bool {
        let failures = self.failures.lock().expect("breaker lock poisoned");
        failures.get(family).is_some_and(|n| *n >= self.threshold)
    }

    /// Record one failure. Returns true if this failure opened (or kept
    /// open) the circuit.
    pub fn record_failure(&self, family: &str) -> bool {
        let mut failures = self.failures.lock().expect("breaker lock poisoned");
        let count = failures.entry(family.to_string()).or_insert(0);
        *count += 1;
        let opened = *count >= self.threshold;
        if *count == self.threshold {
            tracing::warn!(family, failures = *count, "circuit opened");
        }
        opened
    }

    /// Any success for a family resets its counter and closes the circuit.
    pub fn record_success(&self, family: &str) {
        let mut failures = self.failures.lock().expect("breaker lock poisoned");
        if failures.remove(family).is_some_and(|n| n >= self.threshold) {
            tracing::info!(family, "circuit closed");
        }
    }

    pub fn failure_count(&self, family: &str) -> u32 {
        let failures = self.failures.lock().expect("breaker lock poisoned");
        failures.get(family).copied().unwrap_or(0)
    }
}
