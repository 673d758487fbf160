// ── EWEF Engine: Metacognitive Explanation ─────────────────────────────────
//
// Builds the deterministic, human-readable rationale for one analysis
// bundle: VAD thresholded into descriptive bands, the MHH variables that
// cleared the confidence bar (or two tentative defaults when none did), and
// an emotion-specific call-out keyed by the primary category.
//
// Pure formatting over already-computed values — nothing here can fail, so
// the "neutral default string" path only covers a structurally empty bundle.

use crate::atoms::constants::EXPLANATION_MHH_CONFIDENCE;
use crate::atoms::types::{
    EwefAnalysis, MhhAcceptanceState, MhhPerspective, MhhSource, MhhTimeframe,
};

/// Render the rationale string for a turn.
pub fn generate_explanation(analysis: &EwefAnalysis) -> String {
    let vad = &analysis.vad;

    let valence_band = if vad.valence < -0.5 {
        "strongly negative"
    } else if vad.valence < -0.15 {
        "negative"
    } else if vad.valence > 0.5 {
        "strongly positive"
    } else if vad.valence > 0.15 {
        "positive"
    } else {
        "neutral"
    };

    let arousal_band = if vad.arousal > 0.7 {
        "high activation"
    } else if vad.arousal > 0.4 {
        "moderate activation"
    } else {
        "low activation"
    };

    let dominance_band = if vad.dominance < 0.35 {
        "a reduced sense of control"
    } else if vad.dominance > 0.65 {
        "a strong sense of control"
    } else {
        "a moderate sense of control"
    };

    let mut parts = vec![format!(
        "The message reads as {valence_band} with {arousal_band} and {dominance_band}."
    )];

    parts.push(describe_rule_variables(analysis));

    if let Some(cat) = &analysis.emotion_categorization {
        if let Some(callout) = category_callout(&cat.primary_label) {
            parts.push(format!(
                "The pattern is most consistent with {}: {}",
                cat.primary_label.to_lowercase(),
                callout
            ));
        }
    }

    parts.push(format!(
        "Overall analysis confidence is {:.0}%.",
        analysis.analysis_confidence.clamp(0.0, 1.0) * 100.0
    ));

    parts.join(" ")
}

/// List MHH variables above the confidence bar; fall back to two tentative
/// defaults (source and acceptance) when none qualify.
fn describe_rule_variables(analysis: &EwefAnalysis) -> String {
    let rv = &analysis.rule_variables;
    let mut confident: Vec<String> = Vec::new();

    if rv.source.confidence >= EXPLANATION_MHH_CONFIDENCE {
        confident.push(format!("the situation appears {}", source_phrase(rv.source.value)));
    }
    if rv.perspective.confidence >= EXPLANATION_MHH_CONFIDENCE {
        confident.push(format!(
            "it is framed from {}",
            perspective_phrase(rv.perspective.value)
        ));
    }
    if rv.timeframe.confidence >= EXPLANATION_MHH_CONFIDENCE {
        confident.push(format!(
            "it is oriented toward {}",
            timeframe_phrase(rv.timeframe.value)
        ));
    }
    if rv.acceptance_state.confidence >= EXPLANATION_MHH_CONFIDENCE {
        confident.push(format!(
            "the situation seems {}",
            acceptance_phrase(rv.acceptance_state.value)
        ));
    }

    if confident.is_empty() {
        return format!(
            "Tentatively, the situation appears {} and seems {}.",
            source_phrase(rv.source.value),
            acceptance_phrase(rv.acceptance_state.value)
        );
    }
    let mut sentence = confident.join(", ");
    sentence.push('.');
    // Sentence-case the first fragment.
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => sentence,
    }
}

fn source_phrase(source: MhhSource) -> &'static str {
    match source {
        MhhSource::Internal => "rooted in the speaker's own inner state",
        MhhSource::External => "driven by outside circumstances",
        MhhSource::ValueSelf => "tied to the speaker's values",
    }
}

fn perspective_phrase(perspective: MhhPerspective) -> &'static str {
    match perspective {
        MhhPerspective::SelfPerspective => "the speaker's own viewpoint",
        MhhPerspective::Other => "another person's viewpoint",
        MhhPerspective::Both => "a shared viewpoint",
    }
}

fn timeframe_phrase(timeframe: MhhTimeframe) -> &'static str {
    match timeframe {
        MhhTimeframe::Past => "something that already happened",
        MhhTimeframe::Present => "what is happening now",
        MhhTimeframe::Future => "something ahead",
    }
}

fn acceptance_phrase(acceptance: MhhAcceptanceState) -> &'static str {
    match acceptance {
        MhhAcceptanceState::Accepted => "accepted",
        MhhAcceptanceState::Resisted => "resisted rather than accepted",
        MhhAcceptanceState::Uncertain => "not yet settled",
    }
}

/// Emotion-specific variable call-outs keyed by the primary category.
fn category_callout(label: &str) -> Option<&'static str> {
    match label {
        "Anxiety" => Some("a forward-looking concern the speaker is pushing against."),
        "Fear" => Some("a significant threat with little felt control."),
        "Anger" => Some("an externally attributed violation being resisted."),
        "Frustration" => Some("a blocked intention the speaker keeps running into."),
        "Sadness" => Some("a loss that is being absorbed rather than fought."),
        "Grief" => Some("a deep loss, already in the past and being carried."),
        "Guilt" => Some("harm to someone else attributed to the speaker's own actions."),
        "Embarrassment" => Some("a misstep under other people's eyes."),
        "Joy" => Some("a welcome shift in something the speaker cares about."),
        "Excitement" => Some("an energizing prospect the speaker is drawn toward."),
        "Pride" => Some("an achievement the speaker owns."),
        "Confusion" => Some("an unsettled reading of the situation."),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
