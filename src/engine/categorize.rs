// ── EWEF Engine: Emotion Categorization ────────────────────────────────────
//
// Maps the MHH appraisal pattern onto a discrete emotion label with a
// probability distribution. Two passes:
//   1. Rule scoring — additive bonuses over (valuation sign/magnitude,
//      acceptance, source, timeframe, power, social cues), one score per
//      candidate label.
//   2. VAD consistency — each label carries a prototype point in affect
//      space; candidates far from the computed VAD vector are damped.
// Scores are normalized into a distribution; the argmax becomes the primary
// label. Weak evidence degrades to a Neutral primary rather than guessing.

use crate::atoms::types::{
    CategoryScore, EmotionCategorization, MhhAcceptanceState, MhhSource, MhhTimeframe,
    PerceptionInstance, SocialContext, VadOutput,
};
use crate::engine::social::{embarrassment_likelihood, guilt_likelihood, pride_likelihood};

// ═══════════════════════════════════════════════════════════════════════════
// Label Table
// ═══════════════════════════════════════════════════════════════════════════

/// Candidate label, its emotion group, and its VAD prototype.
struct LabelSpec {
    label: &'static str,
    group: &'static str,
    prototype: (f32, f32, f32),
}

const LABELS: &[LabelSpec] = &[
    LabelSpec { label: "Joy", group: "Joy", prototype: (0.7, 0.6, 0.6) },
    LabelSpec { label: "Excitement", group: "Joy", prototype: (0.7, 0.85, 0.6) },
    LabelSpec { label: "Pride", group: "SelfConscious", prototype: (0.7, 0.55, 0.75) },
    LabelSpec { label: "Sadness", group: "Sadness", prototype: (-0.7, 0.25, 0.25) },
    LabelSpec { label: "Grief", group: "Sadness", prototype: (-0.85, 0.4, 0.15) },
    LabelSpec { label: "Anger", group: "Anger", prototype: (-0.6, 0.8, 0.65) },
    LabelSpec { label: "Frustration", group: "Anger", prototype: (-0.55, 0.7, 0.4) },
    LabelSpec { label: "Anxiety", group: "Fear", prototype: (-0.55, 0.75, 0.3) },
    LabelSpec { label: "Fear", group: "Fear", prototype: (-0.7, 0.85, 0.2) },
    LabelSpec { label: "Guilt", group: "SelfConscious", prototype: (-0.6, 0.5, 0.3) },
    LabelSpec { label: "Embarrassment", group: "SelfConscious", prototype: (-0.5, 0.6, 0.25) },
    LabelSpec { label: "Confusion", group: "Neutral", prototype: (-0.2, 0.5, 0.35) },
    LabelSpec { label: "Neutral", group: "Neutral", prototype: (0.0, 0.25, 0.5) },
];

/// Raw evidence floor for a non-Neutral primary label.
const PRIMARY_EVIDENCE_FLOOR: f32 = 0.2;

// ═══════════════════════════════════════════════════════════════════════════
// Categorization
// ═══════════════════════════════════════════════════════════════════════════

/// Categorize the turn's appraisal into a discrete emotion distribution.
pub fn categorize_emotion(
    p: &PerceptionInstance,
    vad: &VadOutput,
    social: &SocialContext,
) -> EmotionCategorization {
    let scored: Vec<(usize, f32)> = LABELS
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let rule = rule_score(spec.label, p, vad, social);
            let consistency = vad_consistency(spec.prototype, vad);
            (i, rule * (0.5 + 0.5 * consistency))
        })
        .collect();

    let (best_idx, best_score) = scored
        .iter()
        .copied()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((LABELS.len() - 1, 0.0));

    let primary = if best_score < PRIMARY_EVIDENCE_FLOOR {
        &LABELS[LABELS.len() - 1] // Neutral
    } else {
        &LABELS[best_idx]
    };

    let total: f32 = scored.iter().map(|(_, s)| s.max(0.0)).sum();
    let mut category_distribution: Vec<CategoryScore> = scored
        .iter()
        .map(|(i, s)| CategoryScore {
            label: LABELS[*i].label.to_string(),
            probability: if total > f32::EPSILON {
                (s.max(0.0) / total).clamp(0.0, 1.0)
            } else if LABELS[*i].label == "Neutral" {
                1.0
            } else {
                0.0
            },
        })
        .collect();
    category_distribution
        .sort_by(|a, b| b.probability.total_cmp(&a.probability).then(a.label.cmp(&b.label)));

    EmotionCategorization {
        primary_label: primary.label.to_string(),
        emotion_group: primary.group.to_string(),
        category_distribution,
    }
}

/// Additive rule bonuses for one candidate label.
fn rule_score(
    label: &str,
    p: &PerceptionInstance,
    vad: &VadOutput,
    social: &SocialContext,
) -> f32 {
    let shift = p.valuation_shift;
    let mag = shift.abs();
    let negative = shift < -0.05;
    let positive = shift > 0.05;
    let accepted = p.acceptance_state == MhhAcceptanceState::Accepted;
    let resisted = p.acceptance_state == MhhAcceptanceState::Resisted;
    let uncertain = p.acceptance_state == MhhAcceptanceState::Uncertain;
    let internal = matches!(p.source, MhhSource::Internal | MhhSource::ValueSelf);
    let external = p.source == MhhSource::External;
    let future = p.timeframe == MhhTimeframe::Future;
    let past = p.timeframe == MhhTimeframe::Past;

    let score = match label {
        "Joy" => bonus(positive, 0.5) + bonus(positive && accepted, 0.2) + bonus(positive && internal, 0.1),
        "Excitement" => bonus(positive, 0.4) + bonus(positive && future, 0.25) + bonus(positive && vad.arousal > 0.6, 0.15),
        "Pride" => pride_likelihood(social, p) * 0.9,
        "Sadness" => {
            bonus(negative, 0.4)
                + bonus(negative && accepted, 0.2)
                + bonus(negative && past, 0.1)
                + bonus(negative && vad.arousal < 0.4, 0.15)
        }
        "Grief" => bonus(negative && mag > 0.6, 0.3) + bonus(negative && past, 0.2) + bonus(negative && accepted, 0.2),
        "Anger" => {
            bonus(negative, 0.3)
                + bonus(negative && resisted, 0.25)
                + bonus(negative && external, 0.25)
                + bonus(negative && mag > 0.5, 0.1)
        }
        "Frustration" => bonus(negative, 0.35) + bonus(negative && resisted, 0.25) + bonus(negative && internal, 0.1),
        "Anxiety" => {
            bonus(negative, 0.3)
                + bonus(negative && future, 0.3)
                + bonus(negative && resisted, 0.15)
                + bonus(negative && uncertain, 0.1)
        }
        "Fear" => {
            bonus(negative, 0.25)
                + bonus(negative && p.power_level > 0.7, 0.25)
                + bonus(negative && future, 0.15)
                + bonus(negative && external, 0.1)
        }
        "Guilt" => guilt_likelihood(social, p) * 0.9,
        "Embarrassment" => embarrassment_likelihood(social, p) * 0.9,
        "Confusion" => {
            bonus(uncertain, 0.35) + bonus(p.appraisal_confidence < 0.5, 0.2) + bonus(negative, 0.05)
        }
        "Neutral" => (1.0 - mag) * 0.35,
        _ => 0.0,
    };
    score.clamp(0.0, 1.5)
}

fn bonus(condition: bool, value: f32) -> f32 {
    if condition {
        value
    } else {
        0.0
    }
}

/// 1 − normalized distance between the label prototype and the computed VAD.
/// Valence spans twice the range of the other axes, so it is halved first.
fn vad_consistency(prototype: (f32, f32, f32), vad: &VadOutput) -> f32 {
    let dv = (prototype.0 - vad.valence) / 2.0;
    let da = prototype.1 - vad.arousal;
    let dd = prototype.2 - vad.dominance;
    let distance = ((dv * dv + da * da + dd * dd) / 3.0).sqrt();
    (1.0 - distance).clamp(0.0, 1.0)
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
