//! Resilient LLM extraction dispatcher for construction-document batches.
//!
//! The core is a model-tier selection policy, a dual-protocol request
//! adapter (chat-completions and the Responses API), a content-addressed
//! response cache, a per-family circuit breaker with an ordered fallback
//! chain, and a bounded worker pool that drives it all under per-task
//! deadlines.

pub mod breaker;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod prompts;
pub mod protocol;
