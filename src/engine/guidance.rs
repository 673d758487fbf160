// ── EWEF Engine: Interaction Guidance ──────────────────────────────────────
//
// Priority-ordered decision table mapping the analysis bundle to a dialogue
// act recommendation for the downstream conversational agent.
//
//   1. strongly negative valence → emotion-specific act per category group
//   2. positive + high arousal joy → amplify
//   3. weak confidence or neutral category → explore
//   4. fallback → acknowledge
//
// Focus tags are appended from rule-variable signals *independently* of the
// primary act. Pure decision function — no side effects, never panics;
// missing inputs degrade toward the neutral guidance object.

use serde_json::json;

use crate::atoms::types::{
    DialogueAct, EmotionCategorization, InteractionGuidance, MhhAcceptanceState, MhhSource,
    MhhTimeframe, PerceptionInstance, RuleVariables, VadOutput,
};

/// Valence below this always routes to the emotion-specific table.
const NEGATIVE_VALENCE_GATE: f32 = -0.5;
/// A confidently categorized negative emotion routes there from this
/// milder valence as well.
const SOFT_NEGATIVE_VALENCE_GATE: f32 = -0.2;
/// VAD confidence below this routes to topic exploration.
const LOW_CONFIDENCE_GATE: f32 = 0.4;
/// Rule-variable confidence needed for its focus tag / parameters.
const FOCUS_CONFIDENCE_GATE: f32 = 0.6;
/// Perception power level below this adds the empowerment focus.
const LOW_POWER_GATE: f32 = 0.35;

/// Produce the dialogue-act recommendation for one analyzed turn.
pub fn generate_interaction_guidance(
    vad: &VadOutput,
    categorization: Option<&EmotionCategorization>,
    p_instance: Option<&PerceptionInstance>,
    rule_variables: Option<&RuleVariables>,
) -> InteractionGuidance {
    let mut guidance = primary_act(vad, categorization, rule_variables);
    append_focus_tags(&mut guidance, p_instance, rule_variables);
    guidance
}

fn primary_act(
    vad: &VadOutput,
    categorization: Option<&EmotionCategorization>,
    rule_variables: Option<&RuleVariables>,
) -> InteractionGuidance {
    let group = categorization.map(|c| c.emotion_group.as_str());
    let label = categorization.map(|c| c.primary_label.as_str()).unwrap_or("");

    // 1. Strong negative affect — or a confidently categorized negative
    //    emotion at milder valence — acts on the specific emotion.
    let negative_group = matches!(
        group,
        Some("Sadness") | Some("Anger") | Some("Fear") | Some("SelfConscious")
    );
    if vad.valence < NEGATIVE_VALENCE_GATE
        || (vad.valence < SOFT_NEGATIVE_VALENCE_GATE
            && negative_group
            && vad.confidence >= 0.5)
    {
        let mut guidance = InteractionGuidance::neutral();
        guidance.parameters.insert("emotion".into(), json!(label));
        guidance
            .parameters
            .insert("intensity".into(), json!(vad.arousal));

        match group {
            Some("Sadness") => {
                guidance.primary_dialogue_act = DialogueAct::ValidateEmotion;
            }
            Some("Anger") => {
                guidance.primary_dialogue_act = DialogueAct::DeEscalate;
                guidance.parameters.insert("validateFirst".into(), json!(true));
                // An external, confidently-attributed trigger is worth naming.
                if let Some(rv) = rule_variables {
                    if rv.source.value == MhhSource::External
                        && rv.source.confidence > FOCUS_CONFIDENCE_GATE
                    {
                        guidance.suggested_focus.push("External Triggers".into());
                    }
                }
            }
            Some("Fear") => {
                guidance.primary_dialogue_act = DialogueAct::OfferSupport;
            }
            Some("SelfConscious") => {
                guidance.primary_dialogue_act = DialogueAct::ValidateEmotion;
            }
            Some("Neutral") if label == "Confusion" => {
                guidance.primary_dialogue_act = DialogueAct::AskClarify;
            }
            _ => {
                guidance.primary_dialogue_act = DialogueAct::ValidateEmotion;
            }
        }
        return guidance;
    }

    // 2. Positive, energized joy: amplify it.
    if vad.valence > 0.3 && vad.arousal > 0.6 && group == Some("Joy") {
        let mut guidance = InteractionGuidance::neutral();
        guidance.primary_dialogue_act = DialogueAct::AmplifyPositive;
        guidance.parameters.insert("emotion".into(), json!(label));
        return guidance;
    }

    // 3. Weak evidence either way: open the topic up.
    if vad.confidence < LOW_CONFIDENCE_GATE || group == Some("Neutral") || group.is_none() {
        let mut guidance = InteractionGuidance::neutral();
        guidance.primary_dialogue_act = DialogueAct::ExploreTopic;
        return guidance;
    }

    // 4. Nothing decisive.
    InteractionGuidance::neutral()
}

/// Focus tags from rule-variable signals, independent of the primary act.
fn append_focus_tags(
    guidance: &mut InteractionGuidance,
    p_instance: Option<&PerceptionInstance>,
    rule_variables: Option<&RuleVariables>,
) {
    if let Some(rv) = rule_variables {
        if rv.timeframe.value == MhhTimeframe::Future
            && rv.timeframe.confidence >= FOCUS_CONFIDENCE_GATE
        {
            push_unique(&mut guidance.suggested_focus, "Future Planning");
        }
        if rv.acceptance_state.value == MhhAcceptanceState::Resisted
            && rv.acceptance_state.confidence >= FOCUS_CONFIDENCE_GATE
        {
            push_unique(&mut guidance.suggested_focus, "Acceptance Challenges");
        }
    }
    if let Some(p) = p_instance {
        if p.power_level < LOW_POWER_GATE {
            push_unique(&mut guidance.suggested_focus, "Empowerment Strategies");
        }
    }
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
