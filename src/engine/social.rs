// ── EWEF Engine: Social Cue Sub-models ─────────────────────────────────────
//
// Pattern-detects guilt/pride/embarrassment scenario context from the
// combined keyword/entity/concept text, then scores three self-conscious
// emotion likelihoods via additive rule bonuses.
//
// These are read-only refinement signals for the categorizer — never gating
// logic. No side effects, no I/O.

use crate::atoms::types::{
    Entity, MhhPerspective, MhhSource, PerceptionInstance, SocialContext,
};
use crate::engine::nlp::count_marker_hits;

// ═══════════════════════════════════════════════════════════════════════════
// Scenario Markers
// ═══════════════════════════════════════════════════════════════════════════

const HARM_MARKERS: &[&str] = &[
    "hurt",
    "let down",
    "let them down",
    "betrayed",
    "lied",
    "yelled at",
    "disappointed",
    "my fault",
    "apologize",
    "sorry",
    "wronged",
    "unfair to",
];

const ACHIEVEMENT_MARKERS: &[&str] = &[
    "promotion",
    "promoted",
    "award",
    "passed",
    "won",
    "graduated",
    "finished",
    "achieved",
    "accomplished",
    "success",
    "nailed",
    "milestone",
];

const EXPOSURE_MARKERS: &[&str] = &[
    "in front of everyone",
    "in front of the",
    "audience",
    "presentation",
    "public",
    "laughed at",
    "judged",
    "watching me",
    "stage",
    "everyone saw",
    "embarrass",
];

const PERSON_MARKERS: &[&str] = &[
    "friend",
    "mother",
    "father",
    "mom",
    "dad",
    "partner",
    "boss",
    "coworker",
    "colleague",
    "brother",
    "sister",
    "wife",
    "husband",
    "they",
    "them",
    "him",
    "her",
];

// ═══════════════════════════════════════════════════════════════════════════
// Scenario Detection
// ═══════════════════════════════════════════════════════════════════════════

/// Scan the combined keyword/entity/concept text for scenario flags.
pub fn detect_social_context(
    keywords: &[String],
    entities: &[Entity],
    concepts: &[String],
) -> SocialContext {
    let mut combined = String::new();
    for k in keywords {
        combined.push_str(k);
        combined.push(' ');
    }
    for e in entities {
        combined.push_str(&e.text);
        combined.push(' ');
    }
    for c in concepts {
        combined.push_str(c);
        combined.push(' ');
    }
    let combined = combined.to_lowercase();

    let is_harm_to_other_scenario = count_marker_hits(&combined, HARM_MARKERS) > 0;
    let is_achievement_scenario = count_marker_hits(&combined, ACHIEVEMENT_MARKERS) > 0;
    let is_public_exposure_scenario = count_marker_hits(&combined, EXPOSURE_MARKERS) > 0;
    let involves_another_person = count_marker_hits(&combined, PERSON_MARKERS) > 0
        || entities
            .iter()
            .any(|e| e.entity_type.eq_ignore_ascii_case("person"));

    let flags_set = [
        is_harm_to_other_scenario,
        is_achievement_scenario,
        is_public_exposure_scenario,
        involves_another_person,
    ]
    .iter()
    .filter(|f| **f)
    .count();

    let perspective_confidence = if flags_set == 0 {
        0.3
    } else {
        (0.4 + 0.15 * flags_set as f32).min(0.9)
    };

    SocialContext {
        is_harm_to_other_scenario,
        is_achievement_scenario,
        is_public_exposure_scenario,
        involves_another_person,
        perspective_confidence,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Likelihood Functions
// ═══════════════════════════════════════════════════════════════════════════

/// Guilt: negative valuation shift over harm done to another, appraised from
/// an internal/value source. An external source collapses the likelihood
/// toward 0 — you rarely feel guilty about what was done *to* you.
pub fn guilt_likelihood(social: &SocialContext, p: &PerceptionInstance) -> f32 {
    if p.source == MhhSource::External {
        return (0.05 * social.perspective_confidence).clamp(0.0, 1.0);
    }

    let mut likelihood = 0.1;
    if p.valuation_shift < 0.0 && social.is_harm_to_other_scenario {
        likelihood += 0.45;
    }
    if matches!(p.source, MhhSource::Internal | MhhSource::ValueSelf) {
        likelihood += 0.2;
    }
    if social.involves_another_person {
        likelihood += 0.15;
    }
    likelihood += p.valuation_shift.abs() * 0.1;
    likelihood.clamp(0.0, 1.0)
}

/// Pride: positive valuation shift over an achievement, self-attributed.
pub fn pride_likelihood(social: &SocialContext, p: &PerceptionInstance) -> f32 {
    let mut likelihood = 0.1;
    if p.valuation_shift > 0.0 && social.is_achievement_scenario {
        likelihood += 0.45;
    }
    if matches!(p.source, MhhSource::Internal | MhhSource::ValueSelf) {
        likelihood += 0.2;
    }
    if social.is_public_exposure_scenario {
        likelihood += 0.05;
    }
    likelihood += p.valuation_shift.max(0.0) * 0.1;
    if p.source == MhhSource::External {
        likelihood *= 0.5;
    }
    likelihood.clamp(0.0, 1.0)
}

/// Embarrassment: negative valuation shift while exposed to others' view.
pub fn embarrassment_likelihood(social: &SocialContext, p: &PerceptionInstance) -> f32 {
    let mut likelihood = 0.1;
    if p.valuation_shift < 0.0 && social.is_public_exposure_scenario {
        likelihood += 0.45;
    }
    if social.involves_another_person {
        likelihood += 0.15;
    }
    if matches!(p.perspective, MhhPerspective::Other | MhhPerspective::Both) {
        likelihood += 0.1;
    }
    likelihood += p.valuation_shift.abs() * 0.1;
    likelihood.clamp(0.0, 1.0)
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{MhhAcceptanceState, MhhTimeframe};

    fn p_instance(source: MhhSource, shift: f32) -> PerceptionInstance {
        PerceptionInstance {
            source,
            perspective: MhhPerspective::SelfPerspective,
            timeframe: MhhTimeframe::Present,
            acceptance_state: MhhAcceptanceState::Uncertain,
            valuation_shift: shift,
            power_level: 0.5,
            appraisal_confidence: 0.7,
        }
    }

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn harm_keywords_set_the_guilt_scenario_flag() {
        let ctx = detect_social_context(&kw(&["betrayed", "friend"]), &[], &[]);
        assert!(ctx.is_harm_to_other_scenario);
        assert!(ctx.involves_another_person);
        assert!(ctx.perspective_confidence > 0.3);
    }

    #[test]
    fn person_entity_sets_involvement_flag() {
        let entities = vec![Entity {
            text: "Maria".into(),
            entity_type: "PERSON".into(),
        }];
        let ctx = detect_social_context(&[], &entities, &[]);
        assert!(ctx.involves_another_person);
    }

    #[test]
    fn no_signals_mean_low_perspective_confidence() {
        let ctx = detect_social_context(&kw(&["report", "quarterly"]), &[], &[]);
        assert!((ctx.perspective_confidence - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn guilt_high_when_internal_negative_harm() {
        let ctx = detect_social_context(&kw(&["let down", "friend"]), &[], &[]);
        let likelihood = guilt_likelihood(&ctx, &p_instance(MhhSource::Internal, -0.6));
        assert!(likelihood > 0.7, "likelihood={}", likelihood);
    }

    #[test]
    fn external_source_collapses_guilt() {
        let ctx = detect_social_context(&kw(&["let down", "friend"]), &[], &[]);
        let likelihood = guilt_likelihood(&ctx, &p_instance(MhhSource::External, -0.6));
        assert!(likelihood < 0.1, "likelihood={}", likelihood);
    }

    #[test]
    fn pride_high_on_self_attributed_achievement() {
        let ctx = detect_social_context(&kw(&["promotion", "accomplished"]), &[], &[]);
        let likelihood = pride_likelihood(&ctx, &p_instance(MhhSource::Internal, 0.7));
        assert!(likelihood > 0.7, "likelihood={}", likelihood);
    }

    #[test]
    fn embarrassment_needs_exposure_and_negative_shift() {
        let exposed = detect_social_context(&kw(&["presentation", "laughed at"]), &[], &[]);
        let high = embarrassment_likelihood(&exposed, &p_instance(MhhSource::External, -0.5));
        let private = detect_social_context(&kw(&["journal"]), &[], &[]);
        let low = embarrassment_likelihood(&private, &p_instance(MhhSource::External, -0.5));
        assert!(high > low);
        assert!(high > 0.5, "high={}", high);
    }

    #[test]
    fn likelihoods_stay_in_unit_range() {
        let ctx = detect_social_context(
            &kw(&["betrayed", "promotion", "presentation", "friend"]),
            &[],
            &[],
        );
        for shift in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            for source in [MhhSource::Internal, MhhSource::External, MhhSource::ValueSelf] {
                let p = p_instance(source, shift);
                for v in [
                    guilt_likelihood(&ctx, &p),
                    pride_likelihood(&ctx, &p),
                    embarrassment_likelihood(&ctx, &p),
                ] {
                    assert!((0.0..=1.0).contains(&v), "v={}", v);
                }
            }
        }
    }
}
