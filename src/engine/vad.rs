// ── EWEF Engine: Linear Core-Affect (VAD) Model ────────────────────────────
//
// Deterministic weighted linear combination of every upstream feature into
// Valence, Arousal and Dominance plus a derived confidence. No learning —
// the weight tables are hand-tuned constants injected as `VadWeights`.
//
// Design rules encoded in the default weights:
//   • arousal is driven by the *magnitude* of valuation shift and sentiment,
//     never their sign
//   • resistance raises arousal and lowers dominance
//   • an external source lowers dominance
//   • a future timeframe raises arousal
//
// This function sits in the hot path of every turn, so it is the single most
// important failure-containment boundary in the crate: a non-finite result
// (bad collaborator data propagating NaN) degrades to `VadOutput::safe_default()`
// instead of poisoning the bundle.

use log::warn;

use crate::atoms::types::{
    BootstrappedEp, CulturalContext, EpType, MhhAcceptanceState, MhhPerspective, MhhSource,
    MhhTimeframe, MinimalState, PerceptionInstance, Personality, RuleVariables, VadOutput,
};
use crate::atoms::weights::{DimensionWeights, VadWeights};

// ═══════════════════════════════════════════════════════════════════════════
// Feature Vector
// ═══════════════════════════════════════════════════════════════════════════

/// The engineered feature vector the three weight rows are dotted against.
#[derive(Debug, Clone, Copy, Default)]
struct Features {
    sentiment: f32,
    sentiment_magnitude: f32,
    valuation_shift: f32,
    valuation_magnitude: f32,
    power_level: f32,

    ep_value_count: f32,
    ep_goal_count: f32,
    ep_need_count: f32,

    source_internal: f32,
    source_external: f32,
    source_value_self: f32,

    perspective_self: f32,
    perspective_other: f32,
    perspective_both: f32,

    timeframe_past: f32,
    timeframe_present: f32,
    timeframe_future: f32,

    acceptance_accepted: f32,
    acceptance_resisted: f32,
    acceptance_uncertain: f32,

    mood: f32,
    stress: f32,

    individualism: f32,
    power_distance: f32,
    uncertainty_avoidance: f32,

    openness: f32,
    conscientiousness: f32,
    extraversion: f32,
    agreeableness: f32,
    neuroticism: f32,
}

#[allow(clippy::too_many_arguments)]
fn build_features(
    p_instance: &PerceptionInstance,
    rule_variables: &RuleVariables,
    active_eps: &[BootstrappedEp],
    sentiment_score: f32,
    state: Option<&MinimalState>,
    cultural: Option<&CulturalContext>,
    personality: Option<&Personality>,
) -> Features {
    let mut f = Features::default();

    // Sentiment arrives as a [0,1] polarity; normalize to [−1,1].
    f.sentiment = (sentiment_score.clamp(0.0, 1.0) * 2.0 - 1.0).clamp(-1.0, 1.0);
    f.sentiment_magnitude = f.sentiment.abs();
    f.valuation_shift = p_instance.valuation_shift.clamp(-1.0, 1.0);
    f.valuation_magnitude = f.valuation_shift.abs();
    f.power_level = p_instance.power_level.clamp(0.0, 1.0);

    for ep in active_eps {
        match ep.ep_type {
            EpType::Value => f.ep_value_count += 1.0,
            EpType::Goal => f.ep_goal_count += 1.0,
            EpType::Need => f.ep_need_count += 1.0,
        }
    }

    // Confidence-weighted one-hots: the active category contributes its
    // confidence, the rest contribute zero.
    let c = rule_variables.source.confidence.clamp(0.0, 1.0);
    match rule_variables.source.value {
        MhhSource::Internal => f.source_internal = c,
        MhhSource::External => f.source_external = c,
        MhhSource::ValueSelf => f.source_value_self = c,
    }
    let c = rule_variables.perspective.confidence.clamp(0.0, 1.0);
    match rule_variables.perspective.value {
        MhhPerspective::SelfPerspective => f.perspective_self = c,
        MhhPerspective::Other => f.perspective_other = c,
        MhhPerspective::Both => f.perspective_both = c,
    }
    let c = rule_variables.timeframe.confidence.clamp(0.0, 1.0);
    match rule_variables.timeframe.value {
        MhhTimeframe::Past => f.timeframe_past = c,
        MhhTimeframe::Present => f.timeframe_present = c,
        MhhTimeframe::Future => f.timeframe_future = c,
    }
    let c = rule_variables.acceptance_state.confidence.clamp(0.0, 1.0);
    match rule_variables.acceptance_state.value {
        MhhAcceptanceState::Accepted => f.acceptance_accepted = c,
        MhhAcceptanceState::Resisted => f.acceptance_resisted = c,
        MhhAcceptanceState::Uncertain => f.acceptance_uncertain = c,
    }

    if let Some(s) = state {
        f.mood = s.mood_estimate.clamp(-1.0, 1.0);
        f.stress = s.stress_estimate.clamp(0.0, 1.0);
    }

    // Profile scalars are centered on their 0.5 neutral so a missing profile
    // contributes exactly nothing.
    if let Some(cul) = cultural {
        f.individualism = cul.individualism.clamp(0.0, 1.0) - 0.5;
        f.power_distance = cul.power_distance.clamp(0.0, 1.0) - 0.5;
        f.uncertainty_avoidance = cul.uncertainty_avoidance.clamp(0.0, 1.0) - 0.5;
    }
    if let Some(p) = personality {
        f.openness = p.openness.clamp(0.0, 1.0) - 0.5;
        f.conscientiousness = p.conscientiousness.clamp(0.0, 1.0) - 0.5;
        f.extraversion = p.extraversion.clamp(0.0, 1.0) - 0.5;
        f.agreeableness = p.agreeableness.clamp(0.0, 1.0) - 0.5;
        f.neuroticism = p.neuroticism.clamp(0.0, 1.0) - 0.5;
    }

    f
}

fn dot(w: &DimensionWeights, f: &Features) -> f32 {
    w.bias
        + w.sentiment * f.sentiment
        + w.sentiment_magnitude * f.sentiment_magnitude
        + w.valuation_shift * f.valuation_shift
        + w.valuation_magnitude * f.valuation_magnitude
        + w.power_level * f.power_level
        + w.ep_value_count * f.ep_value_count
        + w.ep_goal_count * f.ep_goal_count
        + w.ep_need_count * f.ep_need_count
        + w.source_internal * f.source_internal
        + w.source_external * f.source_external
        + w.source_value_self * f.source_value_self
        + w.perspective_self * f.perspective_self
        + w.perspective_other * f.perspective_other
        + w.perspective_both * f.perspective_both
        + w.timeframe_past * f.timeframe_past
        + w.timeframe_present * f.timeframe_present
        + w.timeframe_future * f.timeframe_future
        + w.acceptance_accepted * f.acceptance_accepted
        + w.acceptance_resisted * f.acceptance_resisted
        + w.acceptance_uncertain * f.acceptance_uncertain
        + w.mood * f.mood
        + w.stress * f.stress
        + w.individualism * f.individualism
        + w.power_distance * f.power_distance
        + w.uncertainty_avoidance * f.uncertainty_avoidance
        + w.openness * f.openness
        + w.conscientiousness * f.conscientiousness
        + w.extraversion * f.extraversion
        + w.agreeableness * f.agreeableness
        + w.neuroticism * f.neuroticism
}

// ═══════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════

/// Compute the continuous core-affect estimate for one turn.
///
/// Confidence is `0.6·appraisal_confidence + 0.4·mean(rule confidences)`.
/// Valence is clamped to [−1,1]; arousal, dominance and confidence to [0,1].
#[allow(clippy::too_many_arguments)]
pub fn calculate_linear_vad(
    p_instance: &PerceptionInstance,
    rule_variables: &RuleVariables,
    active_eps: &[BootstrappedEp],
    sentiment_score: f32,
    state: Option<&MinimalState>,
    cultural: Option<&CulturalContext>,
    personality: Option<&Personality>,
    weights: &VadWeights,
) -> VadOutput {
    let features = build_features(
        p_instance,
        rule_variables,
        active_eps,
        sentiment_score,
        state,
        cultural,
        personality,
    );

    let valence = dot(&weights.valence, &features);
    let arousal = dot(&weights.arousal, &features);
    let dominance = dot(&weights.dominance, &features);
    let confidence = 0.6 * p_instance.appraisal_confidence.clamp(0.0, 1.0)
        + 0.4 * rule_variables.mean_confidence().clamp(0.0, 1.0);

    if !(valence.is_finite() && arousal.is_finite() && dominance.is_finite()) {
        warn!("[ewef::vad] non-finite affect computation, substituting safe default");
        return VadOutput::safe_default();
    }

    VadOutput::new(valence, arousal, dominance, confidence)
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
