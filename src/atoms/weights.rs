// ── EWEF Atoms: Core-Affect Weight Tables ──────────────────────────────────
// Hand-tuned linear-model weights for the VAD engine. No gradient learning
// happens anywhere in this crate — these constants were tuned by inspection
// against the scenario suite and are injected into the engine as an
// immutable configuration record, so alternative sets are swappable for
// tuning and tests without code changes.
//
// Feature conventions (see `engine::vad` for construction):
//   • sentiment / valuation_shift are signed; the *_magnitude entries see
//     the absolute value — activation is driven by magnitude, not sign.
//   • MHH entries are confidence-weighted one-hots: the active category
//     contributes its confidence, the others contribute 0.
//   • Cultural and personality scalars arrive centered (value − 0.5), so a
//     missing profile contributes exactly nothing.

use serde::{Deserialize, Serialize};

/// Weight row for one output dimension (valence, arousal or dominance).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub bias: f32,

    pub sentiment: f32,
    pub sentiment_magnitude: f32,
    pub valuation_shift: f32,
    pub valuation_magnitude: f32,
    pub power_level: f32,

    pub ep_value_count: f32,
    pub ep_goal_count: f32,
    pub ep_need_count: f32,

    pub source_internal: f32,
    pub source_external: f32,
    pub source_value_self: f32,

    pub perspective_self: f32,
    pub perspective_other: f32,
    pub perspective_both: f32,

    pub timeframe_past: f32,
    pub timeframe_present: f32,
    pub timeframe_future: f32,

    pub acceptance_accepted: f32,
    pub acceptance_resisted: f32,
    pub acceptance_uncertain: f32,

    pub mood: f32,
    pub stress: f32,

    pub individualism: f32,
    pub power_distance: f32,
    pub uncertainty_avoidance: f32,

    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub neuroticism: f32,
}

impl DimensionWeights {
    /// A zeroed row — the starting point for custom weight sets in tests.
    pub fn zeroed() -> Self {
        Self {
            bias: 0.0,
            sentiment: 0.0,
            sentiment_magnitude: 0.0,
            valuation_shift: 0.0,
            valuation_magnitude: 0.0,
            power_level: 0.0,
            ep_value_count: 0.0,
            ep_goal_count: 0.0,
            ep_need_count: 0.0,
            source_internal: 0.0,
            source_external: 0.0,
            source_value_self: 0.0,
            perspective_self: 0.0,
            perspective_other: 0.0,
            perspective_both: 0.0,
            timeframe_past: 0.0,
            timeframe_present: 0.0,
            timeframe_future: 0.0,
            acceptance_accepted: 0.0,
            acceptance_resisted: 0.0,
            acceptance_uncertain: 0.0,
            mood: 0.0,
            stress: 0.0,
            individualism: 0.0,
            power_distance: 0.0,
            uncertainty_avoidance: 0.0,
            openness: 0.0,
            conscientiousness: 0.0,
            extraversion: 0.0,
            agreeableness: 0.0,
            neuroticism: 0.0,
        }
    }
}

/// The full weight configuration for the linear core-affect model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadWeights {
    pub valence: DimensionWeights,
    pub arousal: DimensionWeights,
    pub dominance: DimensionWeights,
}

impl Default for VadWeights {
    fn default() -> Self {
        Self {
            // Valence tracks sign: sentiment and valuation shift dominate,
            // mood inertia and acceptance nudge.
            valence: DimensionWeights {
                bias: 0.0,
                sentiment: 0.35,
                valuation_shift: 0.45,
                source_internal: 0.05,
                source_external: -0.05,
                source_value_self: 0.05,
                timeframe_past: -0.05,
                acceptance_accepted: 0.1,
                acceptance_resisted: -0.15,
                acceptance_uncertain: -0.05,
                mood: 0.15,
                stress: -0.05,
                uncertainty_avoidance: -0.05,
                extraversion: 0.05,
                agreeableness: 0.05,
                neuroticism: -0.15,
                ..DimensionWeights::zeroed()
            },
            // Arousal tracks magnitude: |sentiment| and |valuation shift|,
            // plus resistance, future orientation and stress.
            arousal: DimensionWeights {
                bias: 0.2,
                sentiment_magnitude: 0.3,
                valuation_magnitude: 0.35,
                power_level: 0.2,
                ep_value_count: 0.02,
                ep_goal_count: 0.03,
                ep_need_count: 0.04,
                source_internal: 0.05,
                source_value_self: 0.05,
                timeframe_past: -0.05,
                timeframe_future: 0.15,
                acceptance_accepted: -0.05,
                acceptance_resisted: 0.2,
                acceptance_uncertain: 0.05,
                mood: -0.05,
                stress: 0.25,
                uncertainty_avoidance: 0.1,
                extraversion: 0.05,
                neuroticism: 0.2,
                ..DimensionWeights::zeroed()
            },
            // Dominance starts at the in-control midpoint; external source
            // and resistance pull it down, internal/value-self agency and
            // accepted situations pull it up.
            dominance: DimensionWeights {
                bias: 0.5,
                sentiment: 0.1,
                valuation_shift: 0.1,
                power_level: 0.1,
                source_internal: 0.1,
                source_external: -0.2,
                source_value_self: 0.15,
                perspective_self: 0.05,
                perspective_other: -0.05,
                timeframe_future: -0.05,
                acceptance_accepted: 0.1,
                acceptance_resisted: -0.2,
                acceptance_uncertain: -0.05,
                mood: 0.1,
                stress: -0.15,
                power_distance: -0.05,
                conscientiousness: 0.05,
                extraversion: 0.1,
                neuroticism: -0.1,
                ..DimensionWeights::zeroed()
            },
        }
    }
}
