//! Model-tier selection policy. Pure and total: no I/O, no side effects,
//! every input maps to exactly one RequestSpec.

use crate::config::{DocClass, ExtractorConfig};
use crate::prompts;
use crate::protocol::{ProtocolKind, RequestSpec};

/// Sampling temperature for non-schedule extraction. Schedule and
/// specification sheets are pinned to 0.
const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Floor for shrunk token ceilings.
const MIN_OUTPUT_TOKENS: u32 = 2_048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Small,
    Mid,
    Large,
    Schedule,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Mid => "mid",
            Self::Large => "large",
            Self::Schedule => "schedule",
        }
    }
}

/// Build the request for one document. Rules in strict priority order:
///
/// 1. Schedule/specification documents force the schedule tier (temperature
///    0, document-type-specific ceiling), regardless of length.
/// 2. Otherwise the cost-control override forces the mid tier.
/// 3. Otherwise content length picks small / mid / large.
/// 4. Large and schedule ceilings shrink in discrete steps as content grows
///    past three size bands, then clamp to the provider-wide maximum.
pub fn select(content: &str, class: DocClass, config: &ExtractorConfig) -> (RequestSpec, Tier) {
    let length = content.chars().count();

    let (tier, model, protocol, temperature, ceiling) = if class.is_schedule_like() {
        let ceiling = match class {
            DocClass::Specification => config.specification_tokens,
            _ => config.schedule_tokens,
        };
        (
            Tier::Schedule,
            config.tiers.schedule.clone(),
            ProtocolKind::ResponsesStyle,
            0.0,
            ceiling,
        )
    } else if config.force_mid_tier {
        (
            Tier::Mid,
            config.tiers.mid.clone(),
            ProtocolKind::ChatStyle,
            DEFAULT_TEMPERATURE,
            config.mid_tier_tokens,
        )
    } else if length < config.small_tier_max_chars {
        (
            Tier::Small,
            config.tiers.small.clone(),
            ProtocolKind::ChatStyle,
            DEFAULT_TEMPERATURE,
            config.small_tier_tokens,
        )
    } else if length < config.mid_tier_max_chars {
        (
            Tier::Mid,
            config.tiers.mid.clone(),
            ProtocolKind::ChatStyle,
            DEFAULT_TEMPERATURE,
            config.mid_tier_tokens,
        )
    } else {
        (
            Tier::Large,
            config.tiers.large.clone(),
            ProtocolKind::ChatStyle,
            DEFAULT_TEMPERATURE,
            config.large_tier_tokens,
        )
    };

    let max_output_tokens = bounded_ceiling(ceiling, tier, length, config);

    let spec = RequestSpec {
        model,
        protocol,
        temperature,
        max_output_tokens,
        instructions: prompts::instructions_for(class).to_string(),
        content: content.to_string(),
    };
    (spec, tier)
}

/// Rule 4: shrink large/schedule ceilings in discrete steps past each size
/// band to bound worst-case generation latency, then clamp everything to
/// the provider maximum and a sane floor.
fn bounded_ceiling(ceiling: u32, tier: Tier, length: usize, config: &ExtractorConfig) -> u32 {
    let shrunk = if matches!(tier, Tier::Large | Tier::Schedule) {
        let bands_passed = config.shrink_bands.iter().filter(|b| length > **b).count();
        match bands_passed {
            0 => ceiling,
            1 => ceiling / 4 * 3,
            2 => ceiling / 2,
            _ => ceiling / 4,
        }
    } else {
        ceiling
    };
    shrunk.clamp(MIN_OUTPUT_TOKENS, config.provider_max_tokens)
}
