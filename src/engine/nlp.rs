// ── EWEF Engine: NLP Feature Fallback ──────────────────────────────────────
//
// The pipeline normally receives an `NlpFeatures` bundle from the external
// NLP collaborators (keyword extraction, sentiment classification, NER,
// zero-shot concepts, embeddings). This module supplies the heuristic-first
// half of that dual-mode design: a pure, sub-millisecond extractor used when
// no bundle is supplied, plus shared lexical helpers for the appraisal and
// social-cue stages.
//
// Entities, abstract concepts and embeddings require the external
// collaborators — the heuristic path leaves them empty.

use log::warn;

use crate::atoms::constants::HEURISTIC_KEYWORD_LIMIT;
use crate::atoms::traits::{LlmOptions, TextLlm};
use crate::atoms::types::{Entity, NlpFeatures, Sentiment, SentimentLabel};

// ═══════════════════════════════════════════════════════════════════════════
// Affect Marker Lexicon
// ═══════════════════════════════════════════════════════════════════════════

/// Positive affect markers → positive polarity.
const POSITIVE_MARKERS: &[&str] = &[
    "happy",
    "glad",
    "grateful",
    "thankful",
    "excited",
    "proud",
    "relieved",
    "hopeful",
    "love",
    "wonderful",
    "amazing",
    "great",
    "fantastic",
    "delighted",
    "content",
    "calm",
    "peaceful",
    "confident",
    "accomplished",
    "succeeded",
    "enjoy",
    "looking forward",
    "thrilled",
];

/// Negative affect markers → negative polarity.
const NEGATIVE_MARKERS: &[&str] = &[
    "sad",
    "angry",
    "anxious",
    "afraid",
    "scared",
    "worried",
    "stressed",
    "frustrated",
    "upset",
    "hurt",
    "lonely",
    "ashamed",
    "guilty",
    "embarrassed",
    "hopeless",
    "overwhelmed",
    "terrible",
    "awful",
    "hate",
    "miserable",
    "depressed",
    "exhausted",
    "failed",
    "lost",
    "grief",
    "devastated",
    "nervous",
    "dread",
];

/// Intensifiers → lexical intensity regardless of polarity.
const INTENSIFIER_MARKERS: &[&str] = &[
    "very",
    "really",
    "so ",
    "extremely",
    "incredibly",
    "totally",
    "completely",
    "absolutely",
    "deeply",
    "utterly",
    "can't stop",
    "never felt",
];

/// Words too common to be useful keywords.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see", "two",
    "way", "who", "did", "its", "let", "she", "too", "use", "that", "with", "have", "this",
    "will", "your", "from", "they", "know", "want", "been", "good", "much", "some", "time",
    "very", "when", "come", "here", "just", "like", "long", "make", "many", "more", "only",
    "over", "such", "take", "than", "them", "well", "were", "what", "about", "because", "going",
    "really", "think", "thing", "there", "their", "would", "could", "should", "feel", "feels",
    "feeling", "felt",
];

// ═══════════════════════════════════════════════════════════════════════════
// Heuristic Extraction
// ═══════════════════════════════════════════════════════════════════════════

/// Extract an `NlpFeatures` bundle without any external collaborator.
///
/// Empty/whitespace input yields the neutral bundle: `keywords=[]`,
/// `sentiment={NEUTRAL, 0.5}`, no entities, no concepts, no embedding.
pub fn extract_features_heuristic(text: &str) -> NlpFeatures {
    if text.trim().is_empty() {
        return NlpFeatures::neutral();
    }

    NlpFeatures {
        keywords: extract_keywords(text, HEURISTIC_KEYWORD_LIMIT),
        sentiment: score_sentiment(text),
        entities: Vec::new(),
        abstract_concepts: Vec::new(),
        embedding: None,
    }
}

/// Stopword-filtered frequency keywords, most frequent first, ties broken by
/// first appearance.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut order: Vec<String> = Vec::new();
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for raw in lower.split(|c: char| !c.is_alphanumeric() && c != '\'') {
        let word = raw.trim_matches('\'');
        if word.len() < 3 || STOPWORDS.contains(&word) {
            continue;
        }
        let entry = counts.entry(word.to_string()).or_insert(0);
        if *entry == 0 {
            order.push(word.to_string());
        }
        *entry += 1;
    }

    let mut ranked: Vec<(usize, usize, String)> = order
        .into_iter()
        .enumerate()
        .map(|(first_seen, word)| (counts[&word], first_seen, word))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked.into_iter().take(limit).map(|(_, _, w)| w).collect()
}

/// Marker-lexicon sentiment: polarity score in [0,1] (0.5 = neutral) plus a
/// label by sign.
pub fn score_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let positive_hits = count_marker_hits(&lower, POSITIVE_MARKERS);
    let negative_hits = count_marker_hits(&lower, NEGATIVE_MARKERS);

    if positive_hits + negative_hits == 0 {
        return Sentiment::neutral();
    }

    let polarity = (positive_hits as f32 - negative_hits as f32)
        / (positive_hits as f32 + negative_hits as f32);
    // Damp single-hit texts slightly so one marker does not saturate.
    let strength = ((positive_hits + negative_hits) as f32 * 0.35).min(1.0);
    let score = (0.5 + polarity * 0.5 * strength.max(0.5)).clamp(0.0, 1.0);

    let label = if score > 0.55 {
        SentimentLabel::Positive
    } else if score < 0.45 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    Sentiment { label, score }
}

/// Lexical intensity in [0,1]: exclamation marks, shouted words and
/// intensifier phrases. Shared with the heuristic appraiser.
pub fn lexical_intensity(text: &str) -> f32 {
    let lower = text.to_lowercase();
    let exclamations = text.chars().filter(|c| *c == '!').count();
    let caps_words = text
        .split_whitespace()
        .filter(|w| w.len() > 2 && w.chars().all(|c| !c.is_alphabetic() || c.is_uppercase()))
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .count();
    let intensifiers = count_marker_hits(&lower, INTENSIFIER_MARKERS);

    ((exclamations as f32 * 0.15) + (caps_words as f32 * 0.1) + (intensifiers as f32 * 0.2))
        .clamp(0.0, 1.0)
}

/// Count how many markers appear in the text (case-insensitive substring
/// match; callers pass an already-lowered string).
pub fn count_marker_hits(text: &str, markers: &[&str]) -> usize {
    markers.iter().filter(|m| text.contains(**m)).count()
}

// ═══════════════════════════════════════════════════════════════════════════
// Prompt-Based Enrichment
// ═══════════════════════════════════════════════════════════════════════════

/// Fill in entities and abstract concepts via the text-LLM gateway when the
/// bundle arrived without them. The gateway is asked for a JSON object; any
/// failure (transport, non-JSON, wrong shape) returns the bundle unchanged.
pub async fn enrich_features_llm(
    llm: &dyn TextLlm,
    mut features: NlpFeatures,
    text: &str,
) -> NlpFeatures {
    if text.trim().is_empty()
        || (!features.entities.is_empty() && !features.abstract_concepts.is_empty())
    {
        return features;
    }

    let prompt = format!(
        "Extract named entities and abstract concepts from the utterance.\n\
         Return ONLY JSON: {{\"entities\": [{{\"text\": string, \"type\": string}}], \
         \"abstractConcepts\": [string]}}.\n\
         Utterance: \"{text}\""
    );
    let raw = match llm.generate_text(&prompt, &LlmOptions::default()).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("[ewef::nlp] entity/concept extraction failed: {e}");
            return features;
        }
    };

    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Wire {
        #[serde(default)]
        entities: Vec<Entity>,
        #[serde(default)]
        abstract_concepts: Vec<String>,
    }

    match serde_json::from_str::<Wire>(raw.trim()) {
        Ok(wire) => {
            if features.entities.is_empty() {
                features.entities = wire.entities;
            }
            if features.abstract_concepts.is_empty() {
                features.abstract_concepts = wire.abstract_concepts;
            }
            features
        }
        Err(e) => {
            warn!("[ewef::nlp] extraction output was not valid JSON: {e}");
            features
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
