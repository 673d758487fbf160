// ── EWEF Engine: Self-Map Inference ────────────────────────────────────────
//
// Infers durable attachments (values, goals, needs, beliefs, interests)
// from text, independently of the per-turn appraisal pipeline.
//
// Four candidate generators run as independent producers, each tagging its
// output with an `InferenceMethod`:
//   ZSC       – zero-shot abstract concepts from the NLP bundle
//   NER       – named entities from the NLP bundle
//   KEYWORD   – top-N extracted keywords
//   EMBEDDING – nearest existing attachments, when an embedding and a user
//               context are both available
// The concatenated candidates go through one LLM synthesis pass requesting a
// schema-validated refined array; on synthesis failure the raw candidates
// are returned unchanged so the caller always gets a result. A final stage
// dedups by (name, type), filters by certainty, sorts and truncates.
//
// Persistence (`update_self_map`) merges only VALUE/GOAL nodes in this
// version — other types are logged and skipped — and continues past
// individual upsert failures.

use log::{debug, info, warn};
use serde_json::json;
use uuid::Uuid;

use crate::atoms::constants::{SELF_MAP_CERTAINTY_THRESHOLD, SELF_MAP_MAX_RESULTS};
use crate::atoms::traits::{LlmOptions, SelfMapStore, StructuredLlm};
use crate::atoms::types::{
    AttachmentNode, AttachmentType, InferenceMethod, InferredAttachment, NlpFeatures,
};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════════
// Options
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
pub struct SelfMapOptions {
    /// Candidates below this certainty are dropped after synthesis.
    pub certainty_threshold: f32,
    /// Cap on the returned attachment list.
    pub max_results: usize,
}

impl Default for SelfMapOptions {
    fn default() -> Self {
        Self {
            certainty_threshold: SELF_MAP_CERTAINTY_THRESHOLD,
            max_results: SELF_MAP_MAX_RESULTS,
        }
    }
}

/// Similarity floor for the embedding generator to emit a candidate.
const EMBEDDING_CANDIDATE_FLOOR: f32 = 0.6;

// ═══════════════════════════════════════════════════════════════════════════
// Type-Guessing Lexicon
// ═══════════════════════════════════════════════════════════════════════════

const VALUE_HINTS: &[&str] = &[
    "honesty",
    "integrity",
    "freedom",
    "fairness",
    "loyalty",
    "family",
    "kindness",
    "independence",
    "tradition",
    "faith",
    "justice",
];

const GOAL_HINTS: &[&str] = &[
    "goal",
    "career",
    "promotion",
    "graduate",
    "degree",
    "achieve",
    "finish",
    "launch",
    "marathon",
    "save",
    "buy a house",
];

const NEED_HINTS: &[&str] = &[
    "safety",
    "security",
    "rest",
    "sleep",
    "support",
    "connection",
    "belonging",
    "stability",
    "health",
];

/// Guess the attachment type for a surfaced term.
fn guess_type(term: &str) -> AttachmentType {
    let lower = term.to_lowercase();
    if VALUE_HINTS.iter().any(|h| lower.contains(h)) {
        AttachmentType::Value
    } else if GOAL_HINTS.iter().any(|h| lower.contains(h)) {
        AttachmentType::Goal
    } else if NEED_HINTS.iter().any(|h| lower.contains(h)) {
        AttachmentType::Need
    } else {
        AttachmentType::Concept
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Candidate Generators
// ═══════════════════════════════════════════════════════════════════════════

fn candidates_from_concepts(nlp: &NlpFeatures, text: &str) -> Vec<InferredAttachment> {
    nlp.abstract_concepts
        .iter()
        .map(|concept| {
            InferredAttachment {
                name: concept.clone(),
                attachment_type: guess_type(concept),
                estimated_pl: 5.0,
                estimated_v: nlp.sentiment.signed() * 3.0,
                certainty: 0.5,
                source_text: Some(text.to_string()),
                inference_method: InferenceMethod::Zsc,
            }
            .clamped()
        })
        .collect()
}

fn candidates_from_entities(nlp: &NlpFeatures, text: &str) -> Vec<InferredAttachment> {
    nlp.entities
        .iter()
        .filter(|e| !e.entity_type.eq_ignore_ascii_case("person"))
        .map(|entity| {
            InferredAttachment {
                name: entity.text.clone(),
                attachment_type: AttachmentType::Interest,
                estimated_pl: 4.0,
                estimated_v: nlp.sentiment.signed() * 2.0,
                certainty: 0.4,
                source_text: Some(text.to_string()),
                inference_method: InferenceMethod::Ner,
            }
            .clamped()
        })
        .collect()
}

fn candidates_from_keywords(nlp: &NlpFeatures, text: &str) -> Vec<InferredAttachment> {
    nlp.keywords
        .iter()
        .map(|keyword| {
            let attachment_type = guess_type(keyword);
            // A keyword that hit the value/goal/need lexicon is a stronger
            // signal than a bare frequency keyword.
            let certainty = if attachment_type == AttachmentType::Concept {
                0.35
            } else {
                0.5
            };
            InferredAttachment {
                name: keyword.clone(),
                attachment_type,
                estimated_pl: 4.5,
                estimated_v: nlp.sentiment.signed() * 2.5,
                certainty,
                source_text: Some(text.to_string()),
                inference_method: InferenceMethod::Keyword,
            }
            .clamped()
        })
        .collect()
}

/// Reinforcement candidates: existing attachments the utterance is
/// semantically near. Requires both an embedding and a user context.
async fn candidates_from_embedding(
    nlp: &NlpFeatures,
    user: Option<(&str, &dyn SelfMapStore)>,
    text: &str,
) -> Vec<InferredAttachment> {
    let (Some(embedding), Some((user_id, store))) = (&nlp.embedding, user) else {
        debug!("[ewef::self_map] embedding generator skipped (no embedding or user context)");
        return Vec::new();
    };

    match store.similar_attachments(user_id, embedding, 5).await {
        Ok(scored) => scored
            .into_iter()
            .filter(|(_, score)| *score >= EMBEDDING_CANDIDATE_FLOOR)
            .map(|(node, score)| {
                InferredAttachment {
                    name: node.name,
                    attachment_type: node.attachment_type,
                    estimated_pl: node.power_level,
                    estimated_v: node.valence,
                    certainty: score * 0.8,
                    source_text: Some(text.to_string()),
                    inference_method: InferenceMethod::Embedding,
                }
                .clamped()
            })
            .collect(),
        Err(e) => {
            warn!("[ewef::self_map] embedding candidate search failed: {e}");
            Vec::new()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LLM Synthesis
// ═══════════════════════════════════════════════════════════════════════════

fn build_synthesis_prompt(
    text: &str,
    nlp: &NlpFeatures,
    candidates: &[InferredAttachment],
) -> String {
    let candidate_json =
        serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are refining candidate attachments (things the user cares about) \
         inferred from one utterance.\n\
         Merge duplicates, correct types, drop spurious entries, and adjust \
         estimates. Types: VALUE, GOAL, NEED, BELIEF, INTEREST, IDENTITY, CONCEPT.\n\
         Return ONLY a JSON array of objects: {{\"name\": string, \"type\": string, \
         \"estimatedPL\": 0..10, \"estimatedV\": -10..10, \"certainty\": 0..1, \
         \"sourceText\": string?, \"inferenceMethod\": \"LLM\"|\"COMBINED\"}}.\n\
         Utterance: \"{text}\"\n\
         Keywords: {kw:?}\n\
         Sentiment: {sent:?} ({score:.2})\n\
         Candidates: {candidate_json}",
        kw = nlp.keywords,
        sent = nlp.sentiment.label,
        score = nlp.sentiment.score,
    )
}

/// One synthesis pass over the raw candidates. `None` means the caller keeps
/// the raw list (transport failure or malformed output).
async fn synthesize(
    llm: &dyn StructuredLlm,
    text: &str,
    nlp: &NlpFeatures,
    candidates: &[InferredAttachment],
) -> Option<Vec<InferredAttachment>> {
    let prompt = build_synthesis_prompt(text, nlp, candidates);
    match llm.generate_structured(&prompt, &LlmOptions::default()).await {
        Ok(value) => {
            // Accept either a bare array or {"attachments": [...]}.
            let array = if value.is_array() {
                value
            } else {
                value.get("attachments").cloned().unwrap_or(json!(null))
            };
            match serde_json::from_value::<Vec<InferredAttachment>>(array) {
                Ok(refined) => {
                    Some(refined.into_iter().map(InferredAttachment::clamped).collect())
                }
                Err(e) => {
                    warn!("[ewef::self_map] synthesis output failed validation: {e}");
                    None
                }
            }
        }
        Err(e) => {
            warn!("[ewef::self_map] synthesis call failed: {e}");
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════

/// Infer attachments from one utterance.
///
/// Never fails: worst case is an empty list (empty input) or the raw
/// candidate list (synthesis unavailable).
pub async fn infer_self_map_attachments(
    text: &str,
    nlp: Option<&NlpFeatures>,
    user: Option<(&str, &dyn SelfMapStore)>,
    llm: Option<&dyn StructuredLlm>,
    options: &SelfMapOptions,
) -> Vec<InferredAttachment> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let fallback_nlp;
    let nlp = match nlp {
        Some(n) => n,
        None => {
            fallback_nlp = crate::engine::nlp::extract_features_heuristic(text);
            &fallback_nlp
        }
    };

    let mut candidates = candidates_from_concepts(nlp, text);
    candidates.extend(candidates_from_entities(nlp, text));
    candidates.extend(candidates_from_keywords(nlp, text));
    candidates.extend(candidates_from_embedding(nlp, user, text).await);

    debug!(
        "[ewef::self_map] {} raw candidates from {} keywords / {} entities / {} concepts",
        candidates.len(),
        nlp.keywords.len(),
        nlp.entities.len(),
        nlp.abstract_concepts.len()
    );

    let refined = match llm {
        Some(gateway) => match synthesize(gateway, text, nlp, &candidates).await {
            Some(refined) => refined,
            None => candidates,
        },
        None => candidates,
    };

    finalize(refined, options)
}

/// Dedup by (name, type) keeping the highest certainty, apply the certainty
/// floor, sort descending, truncate.
pub fn finalize(
    attachments: Vec<InferredAttachment>,
    options: &SelfMapOptions,
) -> Vec<InferredAttachment> {
    let mut best: HashMap<(String, AttachmentType), InferredAttachment> = HashMap::new();
    for attachment in attachments {
        let attachment = attachment.clamped();
        let key = (attachment.name.to_lowercase(), attachment.attachment_type);
        match best.get(&key) {
            Some(existing) if existing.certainty >= attachment.certainty => {}
            _ => {
                best.insert(key, attachment);
            }
        }
    }

    let mut result: Vec<InferredAttachment> = best
        .into_values()
        .filter(|a| a.certainty >= options.certainty_threshold)
        .collect();
    result.sort_by(|a, b| b.certainty.total_cmp(&a.certainty).then(a.name.cmp(&b.name)));
    result.truncate(options.max_results);
    result
}

/// Persist inferred attachments to the durable self-map.
///
/// Only VALUE and GOAL types are merged in this version; other types are
/// logged and skipped. Individual upsert failures are logged and the batch
/// continues. Returns the number of successful merges.
pub async fn update_self_map(
    store: &dyn SelfMapStore,
    user_id: &str,
    attachments: &[InferredAttachment],
    interaction_id: Option<&str>,
) -> usize {
    let mut merged = 0usize;
    for attachment in attachments {
        match attachment.attachment_type {
            AttachmentType::Value | AttachmentType::Goal => {}
            other => {
                info!(
                    "[ewef::self_map] skipping {:?} attachment '{}' (type not yet persisted)",
                    other, attachment.name
                );
                continue;
            }
        }

        let node = AttachmentNode {
            id: Uuid::new_v4().to_string(),
            name: attachment.name.clone(),
            attachment_type: attachment.attachment_type,
            power_level: attachment.estimated_pl.clamp(0.0, 10.0),
            valence: attachment.estimated_v.clamp(-10.0, 10.0),
            certainty: attachment.certainty.clamp(0.0, 1.0),
            embedding: None,
        };
        match store.upsert_attachment(user_id, &node, interaction_id).await {
            Ok(()) => merged += 1,
            Err(e) => {
                warn!(
                    "[ewef::self_map] upsert failed for '{}' ({:?}): {e}",
                    attachment.name, attachment.attachment_type
                );
            }
        }
    }
    merged
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::{EngineError, EngineResult};
    use crate::engine::store::MemorySelfMapStore;
    use async_trait::async_trait;

    fn candidate(name: &str, certainty: f32) -> InferredAttachment {
        InferredAttachment {
            name: name.into(),
            attachment_type: AttachmentType::Goal,
            estimated_pl: 6.0,
            estimated_v: 2.0,
            certainty,
            source_text: None,
            inference_method: InferenceMethod::Keyword,
        }
    }

    #[test]
    fn certainty_filter_keeps_only_entries_at_or_above_threshold() {
        let options = SelfMapOptions::default();
        let result = finalize(
            vec![
                candidate("a", 0.9),
                candidate("b", 0.2),
                candidate("c", 0.5),
            ],
            &options,
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "a");
        assert!((result[0].certainty - 0.9).abs() < 1e-6);
        assert_eq!(result[1].name, "c");
        assert!((result[1].certainty - 0.5).abs() < 1e-6);
    }

    #[test]
    fn finalize_dedups_by_name_and_type_keeping_highest_certainty() {
        let options = SelfMapOptions::default();
        let mut other_type = candidate("career", 0.4);
        other_type.attachment_type = AttachmentType::Value;
        let result = finalize(
            vec![candidate("career", 0.5), candidate("Career", 0.8), other_type],
            &options,
        );
        assert_eq!(result.len(), 2);
        let goal = result
            .iter()
            .find(|a| a.attachment_type == AttachmentType::Goal)
            .unwrap();
        assert!((goal.certainty - 0.8).abs() < 1e-6);
    }

    #[test]
    fn finalize_truncates_to_max_results() {
        let options = SelfMapOptions {
            certainty_threshold: 0.0,
            max_results: 3,
        };
        let result = finalize(
            (0..10)
                .map(|i| candidate(&format!("g{i}"), 0.4 + i as f32 * 0.05))
                .collect(),
            &options,
        );
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].name, "g9");
    }

    #[tokio::test]
    async fn empty_text_yields_no_candidates() {
        let result = infer_self_map_attachments(
            "",
            None,
            None,
            None,
            &SelfMapOptions::default(),
        )
        .await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn keyword_generator_surfaces_goal_terms() {
        let result = infer_self_map_attachments(
            "My biggest goal is finishing my degree and starting my career",
            None,
            None,
            None,
            &SelfMapOptions::default(),
        )
        .await;
        assert!(
            result
                .iter()
                .any(|a| a.attachment_type == AttachmentType::Goal),
            "no goal in {result:?}"
        );
        assert!(result
            .iter()
            .all(|a| a.inference_method == InferenceMethod::Keyword));
    }

    #[tokio::test]
    async fn synthesis_failure_returns_raw_candidates() {
        struct DownLlm;
        #[async_trait]
        impl StructuredLlm for DownLlm {
            async fn generate_structured(
                &self,
                _prompt: &str,
                _opts: &LlmOptions,
            ) -> EngineResult<serde_json::Value> {
                Err(EngineError::llm("down"))
            }
        }

        let with_llm = infer_self_map_attachments(
            "I really value honesty in my family",
            None,
            None,
            Some(&DownLlm),
            &SelfMapOptions::default(),
        )
        .await;
        let without_llm = infer_self_map_attachments(
            "I really value honesty in my family",
            None,
            None,
            None,
            &SelfMapOptions::default(),
        )
        .await;
        assert_eq!(with_llm, without_llm);
        assert!(!with_llm.is_empty());
    }

    #[tokio::test]
    async fn synthesis_output_replaces_candidates_when_valid() {
        struct GoodLlm;
        #[async_trait]
        impl StructuredLlm for GoodLlm {
            async fn generate_structured(
                &self,
                _prompt: &str,
                _opts: &LlmOptions,
            ) -> EngineResult<serde_json::Value> {
                Ok(serde_json::json!([{
                    "name": "honesty",
                    "type": "VALUE",
                    "estimatedPL": 8.0,
                    "estimatedV": 7.0,
                    "certainty": 0.85,
                    "inferenceMethod": "COMBINED"
                }]))
            }
        }

        let result = infer_self_map_attachments(
            "I really value honesty",
            None,
            None,
            Some(&GoodLlm),
            &SelfMapOptions::default(),
        )
        .await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "honesty");
        assert_eq!(result[0].attachment_type, AttachmentType::Value);
        assert_eq!(result[0].inference_method, InferenceMethod::Combined);
    }

    #[tokio::test]
    async fn embedding_generator_reinforces_existing_attachments() {
        let store = MemorySelfMapStore::new();
        let node = AttachmentNode {
            id: "n1".into(),
            name: "career growth".into(),
            attachment_type: AttachmentType::Goal,
            power_level: 7.0,
            valence: 6.0,
            certainty: 0.7,
            embedding: Some(vec![1.0, 0.0]),
        };
        store.upsert_attachment("u1", &node, None).await.unwrap();

        let nlp = NlpFeatures {
            embedding: Some(vec![1.0, 0.05]),
            ..NlpFeatures::neutral()
        };
        let result = infer_self_map_attachments(
            "thinking about work again",
            Some(&nlp),
            Some(("u1", &store)),
            None,
            &SelfMapOptions::default(),
        )
        .await;
        assert!(result
            .iter()
            .any(|a| a.inference_method == InferenceMethod::Embedding
                && a.name == "career growth"));
    }

    #[tokio::test]
    async fn update_persists_only_values_and_goals() {
        let store = MemorySelfMapStore::new();
        let attachments = vec![
            InferredAttachment {
                name: "honesty".into(),
                attachment_type: AttachmentType::Value,
                estimated_pl: 8.0,
                estimated_v: 7.0,
                certainty: 0.9,
                source_text: None,
                inference_method: InferenceMethod::Combined,
            },
            InferredAttachment {
                name: "finish degree".into(),
                attachment_type: AttachmentType::Goal,
                estimated_pl: 7.0,
                estimated_v: 5.0,
                certainty: 0.8,
                source_text: None,
                inference_method: InferenceMethod::Combined,
            },
            InferredAttachment {
                name: "astronomy".into(),
                attachment_type: AttachmentType::Interest,
                estimated_pl: 5.0,
                estimated_v: 4.0,
                certainty: 0.7,
                source_text: None,
                inference_method: InferenceMethod::Ner,
            },
        ];
        let merged = update_self_map(&store, "u1", &attachments, Some("turn-1")).await;
        assert_eq!(merged, 2);
        assert_eq!(store.attachment_count("u1"), 2);
    }

    #[tokio::test]
    async fn update_continues_past_individual_failures() {
        struct FlakyStore {
            inner: MemorySelfMapStore,
        }
        #[async_trait]
        impl SelfMapStore for FlakyStore {
            async fn fetch_attachments(
                &self,
                user_id: &str,
            ) -> EngineResult<Vec<AttachmentNode>> {
                self.inner.fetch_attachments(user_id).await
            }
            async fn similar_attachments(
                &self,
                user_id: &str,
                query: &[f32],
                top_k: usize,
            ) -> EngineResult<Vec<(AttachmentNode, f32)>> {
                self.inner.similar_attachments(user_id, query, top_k).await
            }
            async fn upsert_attachment(
                &self,
                user_id: &str,
                node: &AttachmentNode,
                interaction_id: Option<&str>,
            ) -> EngineResult<()> {
                if node.name == "poison" {
                    return Err(EngineError::store("write refused"));
                }
                self.inner.upsert_attachment(user_id, node, interaction_id).await
            }
            async fn fetch_user_state(
                &self,
                user_id: &str,
            ) -> EngineResult<Option<crate::atoms::types::MinimalState>> {
                self.inner.fetch_user_state(user_id).await
            }
            async fn fetch_cultural_context(
                &self,
                user_id: &str,
            ) -> EngineResult<Option<crate::atoms::types::CulturalContext>> {
                self.inner.fetch_cultural_context(user_id).await
            }
            async fn fetch_personality(
                &self,
                user_id: &str,
            ) -> EngineResult<Option<crate::atoms::types::Personality>> {
                self.inner.fetch_personality(user_id).await
            }
            async fn fetch_developmental_stage(
                &self,
                user_id: &str,
            ) -> EngineResult<Option<String>> {
                self.inner.fetch_developmental_stage(user_id).await
            }
        }

        let store = FlakyStore {
            inner: MemorySelfMapStore::new(),
        };
        let mut poison = candidate("poison", 0.9);
        poison.attachment_type = AttachmentType::Goal;
        let mut good = candidate("finish degree", 0.8);
        good.attachment_type = AttachmentType::Goal;
        let merged = update_self_map(&store, "u1", &[poison, good], None).await;
        assert_eq!(merged, 1);
    }
}
