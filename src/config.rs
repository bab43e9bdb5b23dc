use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Document classification hint supplied by the extraction service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocClass {
    Schedule,
    Specification,
    Drawing,
}

impl DocClass {
    /// Schedule and specification sheets always get the schedule-tier model,
    /// regardless of content length or the cost-control override.
    pub fn is_schedule_like(self) -> bool {
        matches!(self, Self::Schedule | Self::Specification)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Specification => "specification",
            Self::Drawing => "drawing",
        }
    }
}

/// Model identifiers per cost/quality tier.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ModelTiers {
    pub small: String,
    pub mid: String,
    pub large: String,
    pub schedule: String,
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self {
            small: "gpt-5-nano".to_string(),
            mid: "gpt-5-mini".to_string(),
            large: "gpt-5".to_string(),
            schedule: "gpt-5".to_string(),
        }
    }
}

/// All dispatcher/pool tunables, built exactly once at startup and passed
/// explicitly into constructors. Never re-read from the environment at call
/// sites — re-reading silently overrides runtime values.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub tiers: ModelTiers,
    /// Backup models tried in order when the primary path fails. Always
    /// called chat-style.
    pub fallback_chain: Vec<String>,
    /// Only the model named here gets the Responses-API reasoning parameter.
    pub reasoning_model: String,
    pub reasoning_effort: String,

    /// Content below this many chars goes to the small tier.
    pub small_tier_max_chars: usize,
    /// Content below this many chars (and at or above the small threshold)
    /// goes to the mid tier; everything larger goes to the large tier.
    pub mid_tier_max_chars: usize,
    /// Force the mid tier for every non-schedule document (cost control).
    pub force_mid_tier: bool,

    pub small_tier_tokens: u32,
    pub mid_tier_tokens: u32,
    pub large_tier_tokens: u32,
    pub schedule_tokens: u32,
    /// Specifications get a tighter ceiling than schedules.
    pub specification_tokens: u32,
    /// Provider-wide hard maximum; every ceiling is clamped to this.
    pub provider_max_tokens: u32,
    /// Content-length bands past which large/schedule ceilings shrink,
    /// ascending. Exactly three bands.
    pub shrink_bands: [usize; 3],

    pub breaker_threshold: u32,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub call_timeout_secs: u64,
    pub task_timeout_secs: u64,

    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
    pub worker_count: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            tiers: ModelTiers::default(),
            fallback_chain: vec!["gpt-4.1-mini".to_string(), "gpt-4o-mini".to_string()],
            reasoning_model: "gpt-5".to_string(),
            reasoning_effort: "low".to_string(),
            small_tier_max_chars: 8_000,
            mid_tier_max_chars: 60_000,
            force_mid_tier: false,
            small_tier_tokens: 4_096,
            mid_tier_tokens: 8_192,
            large_tier_tokens: 16_384,
            schedule_tokens: 24_576,
            specification_tokens: 12_288,
            provider_max_tokens: 32_768,
            shrink_bands: [120_000, 240_000, 400_000],
            breaker_threshold: 3,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            call_timeout_secs: 120,
            task_timeout_secs: 300,
            cache_dir: PathBuf::from(".takeoff/cache"),
            cache_ttl_secs: 24 * 60 * 60,
            worker_count: 4,
        }
    }
}

impl ExtractorConfig {
    /// Load `takeoff.toml` from the working directory if present, then apply
    /// `TAKEOFF_*` environment overrides on top.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("takeoff.toml") {
            Ok(text) => match toml::from_str::<Self>(&text) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("takeoff.toml is invalid, using defaults: {e}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.api_key = key;
        } else if self.api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY not set — live provider calls will fail auth");
        }
        if let Ok(url) = env::var("TAKEOFF_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(v) = env::var("TAKEOFF_FORCE_MID_TIER") {
            self.force_mid_tier = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Some(n) = env_parse("TAKEOFF_WORKER_COUNT") {
            self.worker_count = n;
        }
        if let Some(n) = env_parse("TAKEOFF_CACHE_TTL_SECS") {
            self.cache_ttl_secs = n;
        }
        if let Some(n) = env_parse("TAKEOFF_TASK_TIMEOUT_SECS") {
            self.task_timeout_secs = n;
        }
        if let Ok(dir) = env::var("TAKEOFF_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring unparseable {name}={raw}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let c = ExtractorConfig::default();
        assert!(c.small_tier_max_chars < c.mid_tier_max_chars);
        assert!(c.shrink_bands[0] < c.shrink_bands[1]);
        assert!(c.shrink_bands[1] < c.shrink_bands[2]);
        assert!(c.specification_tokens < c.schedule_tokens);
        assert!(c.schedule_tokens <= c.provider_max_tokens);
        assert!(!c.fallback_chain.is_empty());
    }

    #[test]
    fn toml_partial_override_keeps_other_defaults() {
        let text = r#"
            worker_count = 8
            breaker_threshold = 2

            [tiers]
            schedule = "gpt-5.2"
        "#;
        let c: ExtractorConfig = toml::from_str(text).unwrap();
        assert_eq!(c.worker_count, 8);
        assert_eq!(c.breaker_threshold, 2);
        assert_eq!(c.tiers.schedule, "gpt-5.2");
        assert_eq!(c.tiers.mid, "gpt-5-mini");
        assert_eq!(c.cache_ttl_secs, 24 * 60 * 60);
    }
}
