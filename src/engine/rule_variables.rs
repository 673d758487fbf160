// ── EWEF Engine: MHH Rule-Variable Inference ───────────────────────────────
//
// Classifies the four categorical appraisal dimensions (source, perspective,
// timeframe, acceptance state) from raw text, each with a confidence that
// reflects lexical-signal strength.
//
// Dual-mode: the heuristic path is always available (pure, deterministic,
// keyword-driven); an LLM-assisted path can be layered on top and falls back
// to the heuristic on any failure. The pipeline never sees an error from
// this stage — worst case is the all-default record at 0.5 confidence.

use log::{debug, warn};
use serde_json::Value;

use crate::atoms::constants::{RULE_CONFIDENCE_CEILING, RULE_FAILURE_CONFIDENCE};
use crate::atoms::traits::{LlmOptions, StructuredLlm};
use crate::atoms::types::{
    MhhAcceptanceState, MhhPerspective, MhhSource, MhhTimeframe, RuleVariable, RuleVariables,
    Sentiment, SentimentLabel,
};

// ═══════════════════════════════════════════════════════════════════════════
// Indicator Phrase Lists
// ═══════════════════════════════════════════════════════════════════════════
// Disjoint per dimension. Matching is lower-cased substring containment;
// the category with the most hits wins, ties broken by a fixed priority.

const SOURCE_INTERNAL: &[&str] = &[
    "i feel",
    "i'm feeling",
    "i am feeling",
    "inside me",
    "in my head",
    "my heart",
    "i keep thinking",
    "my own fault",
    "something in me",
];

const SOURCE_EXTERNAL: &[&str] = &[
    "they ",
    "he ",
    "she ",
    "my boss",
    "my coworker",
    "people ",
    "everyone",
    "the news",
    "the weather",
    "at work",
    "the deadline",
    "this situation",
    "what happened to me",
];

const SOURCE_VALUE_SELF: &[&str] = &[
    "i believe",
    "i value",
    "my values",
    "my principles",
    "important to me",
    "matters to me",
    "i stand for",
    "my integrity",
    "who i am",
];

const PERSPECTIVE_SELF: &[&str] = &[
    "i ", "i'm", "i've", "i'll", "me ", "my ", "myself",
];

const PERSPECTIVE_OTHER: &[&str] = &[
    "they ", "them ", "their ", "he ", "she ", "his ", "her ", "you ", "your ",
];

const PERSPECTIVE_BOTH: &[&str] = &["we ", "we're", "us ", "our ", "together", "both of us"];

const TIMEFRAME_PAST: &[&str] = &[
    "yesterday",
    "last week",
    "last night",
    "last year",
    "used to",
    "back then",
    " ago",
    "remember when",
    "happened",
];

const TIMEFRAME_PRESENT: &[&str] = &[
    "right now",
    "currently",
    "today",
    "at the moment",
    "these days",
    "is happening",
];

const TIMEFRAME_FUTURE: &[&str] = &[
    "tomorrow",
    "upcoming",
    "will ",
    "going to",
    "next week",
    "next month",
    "soon",
    "about to",
    "someday",
    "the future",
];

const ACCEPTANCE_ACCEPTED: &[&str] = &[
    "i accept",
    "it is what it is",
    "made peace",
    "i'm okay with",
    "fine with it",
    "come to terms",
    "at peace",
];

const ACCEPTANCE_RESISTED: &[&str] = &[
    "can't accept",
    "shouldn't be",
    "not fair",
    "refuse",
    "can't stand",
    "won't let",
    "don't want",
    "wish it weren't",
    "if only",
    "fighting",
    "anxious about",
    "dreading",
    "hate that",
];

const ACCEPTANCE_UNCERTAIN: &[&str] = &[
    "not sure",
    "maybe",
    "i don't know",
    "unsure",
    "confused",
    "can't decide",
    "torn",
];

// ═══════════════════════════════════════════════════════════════════════════
// Heuristic Path
// ═══════════════════════════════════════════════════════════════════════════

/// Infer the four MHH variables from text. Pure, total function.
///
/// Per-dimension: most indicator hits wins; confidence is
/// `min(0.9, 0.5 + 0.1·hits)`; zero hits falls back to the default category
/// at 0.6. The acceptance-state confidence is then nudged ±0.1 by agreement
/// with sentiment polarity.
pub fn infer_rule_variables(text: &str, sentiment: &Sentiment) -> RuleVariables {
    if text.trim().is_empty() {
        return RuleVariables::defaults_at(RULE_FAILURE_CONFIDENCE);
    }
    let lower = text.to_lowercase();

    // Priority order on ties: valueSelf > internal > external.
    let source = pick3(
        &lower,
        (MhhSource::ValueSelf, SOURCE_VALUE_SELF),
        (MhhSource::Internal, SOURCE_INTERNAL),
        (MhhSource::External, SOURCE_EXTERNAL),
        MhhSource::default(),
    );

    // Priority order on ties: both > self > other ("we" implies both).
    let perspective = pick3(
        &lower,
        (MhhPerspective::Both, PERSPECTIVE_BOTH),
        (MhhPerspective::SelfPerspective, PERSPECTIVE_SELF),
        (MhhPerspective::Other, PERSPECTIVE_OTHER),
        MhhPerspective::default(),
    );

    // Priority order on ties: future > past > present.
    let timeframe = pick3(
        &lower,
        (MhhTimeframe::Future, TIMEFRAME_FUTURE),
        (MhhTimeframe::Past, TIMEFRAME_PAST),
        (MhhTimeframe::Present, TIMEFRAME_PRESENT),
        MhhTimeframe::default(),
    );

    // Priority order on ties: resisted > accepted > uncertain.
    let mut acceptance_state = pick3(
        &lower,
        (MhhAcceptanceState::Resisted, ACCEPTANCE_RESISTED),
        (MhhAcceptanceState::Accepted, ACCEPTANCE_ACCEPTED),
        (MhhAcceptanceState::Uncertain, ACCEPTANCE_UNCERTAIN),
        MhhAcceptanceState::default(),
    );
    acceptance_state.confidence = nudge_by_sentiment(
        acceptance_state.value,
        acceptance_state.confidence,
        sentiment.label,
    );

    RuleVariables {
        source,
        perspective,
        timeframe,
        acceptance_state,
    }
}

/// Score three candidate categories and pick the winner. The candidates are
/// passed highest-priority first, so `>` comparisons implement the fixed
/// tie-break for free.
fn pick3<T: Copy>(
    lower: &str,
    first: (T, &[&str]),
    second: (T, &[&str]),
    third: (T, &[&str]),
    default: T,
) -> RuleVariable<T> {
    let counts = [
        (first.0, hits(lower, first.1)),
        (second.0, hits(lower, second.1)),
        (third.0, hits(lower, third.1)),
    ];

    let mut best = counts[0];
    for candidate in &counts[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }

    if best.1 == 0 {
        return RuleVariable::new(default, crate::atoms::constants::RULE_DEFAULT_CONFIDENCE);
    }
    let confidence = RULE_CONFIDENCE_CEILING.min(0.5 + best.1 as f32 * 0.1);
    RuleVariable::new(best.0, confidence)
}

fn hits(lower: &str, indicators: &[&str]) -> usize {
    indicators.iter().filter(|p| lower.contains(**p)).count()
}

/// ±0.1 confidence nudge when the acceptance reading agrees or disagrees
/// with sentiment polarity (resisted↔negative, accepted↔positive).
fn nudge_by_sentiment(
    value: MhhAcceptanceState,
    confidence: f32,
    sentiment: SentimentLabel,
) -> f32 {
    let delta = match (value, sentiment) {
        (MhhAcceptanceState::Resisted, SentimentLabel::Negative) => 0.1,
        (MhhAcceptanceState::Accepted, SentimentLabel::Positive) => 0.1,
        (MhhAcceptanceState::Resisted, SentimentLabel::Positive) => -0.1,
        (MhhAcceptanceState::Accepted, SentimentLabel::Negative) => -0.1,
        _ => 0.0,
    };
    (confidence + delta).clamp(0.0, 1.0)
}

// ═══════════════════════════════════════════════════════════════════════════
// LLM-Assisted Path
// ═══════════════════════════════════════════════════════════════════════════

/// Ask the structured LLM for the four variables; fall back to the heuristic
/// on transport failure or malformed output.
pub async fn infer_rule_variables_llm(
    llm: &dyn StructuredLlm,
    text: &str,
    sentiment: &Sentiment,
) -> RuleVariables {
    if text.trim().is_empty() {
        return RuleVariables::defaults_at(RULE_FAILURE_CONFIDENCE);
    }

    let prompt = build_prompt(text, sentiment);
    match llm.generate_structured(&prompt, &LlmOptions::default()).await {
        Ok(value) => match parse_llm_rule_variables(&value) {
            Some(rv) => {
                debug!("[ewef::rules] LLM rule-variable inference succeeded");
                rv
            }
            None => {
                warn!("[ewef::rules] LLM output failed shape validation, using heuristic");
                infer_rule_variables(text, sentiment)
            }
        },
        Err(e) => {
            warn!("[ewef::rules] LLM rule-variable inference failed: {e}, using heuristic");
            infer_rule_variables(text, sentiment)
        }
    }
}

fn build_prompt(text: &str, sentiment: &Sentiment) -> String {
    format!(
        "Classify the appraisal dimensions of the user utterance below.\n\
         Return ONLY a JSON object of this exact shape:\n\
         {{\"source\":{{\"value\":\"internal|external|valueSelf\",\"confidence\":0.0}},\n \
          \"perspective\":{{\"value\":\"self|other|both\",\"confidence\":0.0}},\n \
          \"timeframe\":{{\"value\":\"past|present|future\",\"confidence\":0.0}},\n \
          \"acceptanceState\":{{\"value\":\"accepted|resisted|uncertain\",\"confidence\":0.0}}}}\n\
         All confidences in [0,1].\n\
         Sentiment: {:?} ({:.2})\n\
         Utterance: \"{}\"",
        sentiment.label, sentiment.score, text
    )
}

/// Shape-validate and range-clamp the LLM response. `None` means malformed.
fn parse_llm_rule_variables(value: &Value) -> Option<RuleVariables> {
    let mut rv: RuleVariables = serde_json::from_value(value.clone()).ok()?;
    rv.source.confidence = rv.source.confidence.clamp(0.0, 1.0);
    rv.perspective.confidence = rv.perspective.confidence.clamp(0.0, 1.0);
    rv.timeframe.confidence = rv.timeframe.confidence.clamp(0.0, 1.0);
    rv.acceptance_state.confidence = rv.acceptance_state.confidence.clamp(0.0, 1.0);
    Some(rv)
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
