// ── EWEF Engine: Per-Turn Pipeline ─────────────────────────────────────────
//
// Orchestrates one conversational turn end to end:
//   nlp → rule variables → context activation → perception appraisal →
//   linear VAD → categorization → confidence → state update → guidance +
//   explanation.
//
// Resilience model: always produce a structurally valid, bounded-range
// bundle. Collaborator failures degrade stage by stage to documented
// defaults; the only `Err` this returns is `InvalidInput` for unusable
// identifiers. Empty utterances short-circuit to the neutral bundle.
//
// Self-map inference runs on a slower cadence than the per-turn analysis,
// so it is exposed separately (`infer_and_update_self_map`).

use log::{debug, info};
use std::sync::Arc;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{
    EmbeddingProvider, EphemeralCache, LlmOptions, SelfMapStore, StructuredLlm, TextLlm,
};
use crate::atoms::types::{
    EwefAnalysis, InferredAttachment, NlpFeatures, PerceptionInstance, RuleVariables,
    TurnAnalysis,
};
use crate::atoms::weights::VadWeights;
use crate::engine::appraisal::{AppraisalInput, FallbackChain};
use crate::engine::categorize::categorize_emotion;
use crate::engine::confidence;
use crate::engine::context::get_minimal_context;
use crate::engine::guidance::generate_interaction_guidance;
use crate::engine::explain::generate_explanation;
use crate::engine::nlp::{enrich_features_llm, extract_features_heuristic};
use crate::engine::rule_variables::{infer_rule_variables, infer_rule_variables_llm};
use crate::engine::self_map::{infer_self_map_attachments, update_self_map, SelfMapOptions};
use crate::engine::state::{read_minimal_state, update_minimal_state, StateMonitorConfig};
use crate::engine::vad::calculate_linear_vad;
use crate::atoms::constants::RULE_FAILURE_CONFIDENCE;

/// The per-turn appraisal engine with its collaborators and tuning.
pub struct EwefPipeline {
    store: Arc<dyn SelfMapStore>,
    cache: Arc<dyn EphemeralCache>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    llm: Option<Arc<dyn StructuredLlm>>,
    text_llm: Option<Arc<dyn TextLlm>>,
    appraisal_chain: FallbackChain,
    vad_weights: VadWeights,
    state_config: StateMonitorConfig,
    self_map_options: SelfMapOptions,
}

impl EwefPipeline {
    /// Heuristic-only pipeline over the given store and cache.
    pub fn new(store: Arc<dyn SelfMapStore>, cache: Arc<dyn EphemeralCache>) -> Self {
        Self {
            store,
            cache,
            embedder: None,
            llm: None,
            text_llm: None,
            appraisal_chain: FallbackChain::heuristic_only(),
            vad_weights: VadWeights::default(),
            state_config: StateMonitorConfig::default(),
            self_map_options: SelfMapOptions::default(),
        }
    }

    /// Wire in an embedding provider for semantic attachment activation.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Wire in a structured-LLM gateway. Rule-variable inference, perception
    /// appraisal and self-map synthesis all become LLM-first with the
    /// heuristic paths as fallback.
    pub fn with_llm(mut self, llm: Arc<dyn StructuredLlm>) -> Self {
        self.appraisal_chain =
            FallbackChain::llm_with_heuristic(Arc::clone(&llm), LlmOptions::default());
        self.llm = Some(llm);
        self
    }

    /// Wire in a text-LLM gateway for prompt-based entity/concept extraction
    /// when the caller's NLP bundle arrives without them.
    pub fn with_text_llm(mut self, text_llm: Arc<dyn TextLlm>) -> Self {
        self.text_llm = Some(text_llm);
        self
    }

    /// Swap in an alternative weight table.
    pub fn with_vad_weights(mut self, weights: VadWeights) -> Self {
        self.vad_weights = weights;
        self
    }

    /// Swap in alternative temporal-dynamics tuning.
    pub fn with_state_config(mut self, config: StateMonitorConfig) -> Self {
        self.state_config = config;
        self
    }

    /// Swap in alternative self-map filtering options.
    pub fn with_self_map_options(mut self, options: SelfMapOptions) -> Self {
        self.self_map_options = options;
        self
    }

    // ── Per-turn analysis ──────────────────────────────────────────────────

    /// Analyze one utterance. The only error is `InvalidInput` for empty
    /// identifiers; everything else degrades to documented defaults.
    pub async fn analyze(
        &self,
        user_id: &str,
        session_id: &str,
        utterance: &str,
        nlp: Option<NlpFeatures>,
    ) -> EngineResult<TurnAnalysis> {
        if user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("empty user id".into()));
        }
        if session_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("empty session id".into()));
        }

        let empty_utterance = utterance.trim().is_empty();
        let mut nlp = match nlp {
            Some(features) => features,
            None if empty_utterance => NlpFeatures::neutral(),
            None => extract_features_heuristic(utterance),
        };
        if !empty_utterance {
            if let Some(text_llm) = &self.text_llm {
                nlp = enrich_features_llm(text_llm.as_ref(), nlp, utterance).await;
            }
        }

        // 1. Rule variables. Empty input keeps the all-default record.
        let rule_variables = if empty_utterance {
            RuleVariables::defaults_at(RULE_FAILURE_CONFIDENCE)
        } else {
            match &self.llm {
                Some(llm) => {
                    infer_rule_variables_llm(llm.as_ref(), utterance, &nlp.sentiment).await
                }
                None => infer_rule_variables(utterance, &nlp.sentiment),
            }
        };

        // 2. Context: attachment activation + profile modifiers.
        let context = get_minimal_context(
            self.store.as_ref(),
            self.embedder.as_deref(),
            user_id,
            &nlp,
        )
        .await;

        // 3. Perception appraisal (LLM → heuristic → neutral default).
        let p_instance = if empty_utterance {
            PerceptionInstance::neutral(&rule_variables)
        } else {
            let input = AppraisalInput {
                text: utterance,
                sentiment: &nlp.sentiment,
                rule_variables: &rule_variables,
                active_eps: &context.active_eps,
            };
            crate::engine::appraisal::appraise_perception(&self.appraisal_chain, &input).await
        };

        // 4. Previous state: live session cache first, durable record second.
        let previous_state = match read_minimal_state(
            self.cache.as_ref(),
            user_id,
            session_id,
        )
        .await
        {
            Some(state) => Some(state),
            None => context.user_state,
        };

        // 5. Core affect.
        let vad = calculate_linear_vad(
            &p_instance,
            &rule_variables,
            &context.active_eps,
            nlp.sentiment.score,
            previous_state.as_ref(),
            context.cultural_context.as_ref(),
            context.personality.as_ref(),
            &self.vad_weights,
        );

        // 6. Discrete emotion estimate.
        let emotion_categorization =
            categorize_emotion(&p_instance, &vad, &context.social_context);

        // 7. Fold this turn into the rolling mood/stress state.
        let state = update_minimal_state(
            self.cache.as_ref(),
            user_id,
            session_id,
            &vad,
            previous_state,
            &self.state_config,
        )
        .await;

        let analysis_confidence = confidence::compose(
            p_instance.appraisal_confidence,
            rule_variables.mean_confidence(),
            vad.confidence,
        );

        let analysis = EwefAnalysis {
            vad,
            state: Some(state),
            active_eps: context.active_eps,
            p_instance,
            rule_variables,
            emotion_categorization: Some(emotion_categorization),
            analysis_confidence,
        };

        let guidance = generate_interaction_guidance(
            &analysis.vad,
            analysis.emotion_categorization.as_ref(),
            Some(&analysis.p_instance),
            Some(&analysis.rule_variables),
        );
        let explanation = generate_explanation(&analysis);

        debug!(
            "[ewef::pipeline] user={user_id} session={session_id} act={:?} confidence={:.2}",
            guidance.primary_dialogue_act, analysis.analysis_confidence
        );

        Ok(TurnAnalysis {
            analysis,
            guidance,
            explanation,
        })
    }

    // ── Self-map cadence ───────────────────────────────────────────────────

    /// Infer attachments from text and merge the survivors into the durable
    /// self-map. Returns the inferred list and the merge count.
    pub async fn infer_and_update_self_map(
        &self,
        user_id: &str,
        text: &str,
        nlp: Option<&NlpFeatures>,
        interaction_id: Option<&str>,
    ) -> EngineResult<(Vec<InferredAttachment>, usize)> {
        if user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("empty user id".into()));
        }

        let inferred = infer_self_map_attachments(
            text,
            nlp,
            Some((user_id, self.store.as_ref())),
            self.llm.as_deref(),
            &self.self_map_options,
        )
        .await;

        let merged = update_self_map(
            self.store.as_ref(),
            user_id,
            &inferred,
            interaction_id,
        )
        .await;
        info!(
            "[ewef::pipeline] self-map update for {user_id}: {} inferred, {} merged",
            inferred.len(),
            merged
        );
        Ok((inferred, merged))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{
        AttachmentNode, AttachmentType, DialogueAct, MhhAcceptanceState, MhhSource,
        MhhTimeframe, SentimentLabel,
    };
    use crate::engine::cache::MemoryCache;
    use crate::engine::store::MemorySelfMapStore;

    fn pipeline() -> (EwefPipeline, Arc<MemorySelfMapStore>, Arc<MemoryCache>) {
        let store = Arc::new(MemorySelfMapStore::new());
        let cache = Arc::new(MemoryCache::new());
        let pipeline = EwefPipeline::new(
            Arc::clone(&store) as Arc<dyn SelfMapStore>,
            Arc::clone(&cache) as Arc<dyn EphemeralCache>,
        );
        (pipeline, store, cache)
    }

    #[tokio::test]
    async fn empty_utterance_yields_neutral_bundle() {
        let (pipeline, _, _) = pipeline();
        let turn = pipeline.analyze("u1", "s1", "", None).await.unwrap();

        let analysis = &turn.analysis;
        assert!(analysis.active_eps.is_empty());
        assert_eq!(analysis.p_instance.valuation_shift, 0.0);
        assert_eq!(analysis.p_instance.power_level, 0.5);
        assert_eq!(analysis.p_instance.appraisal_confidence, 0.5);
        assert!(analysis.vad.valence.abs() < 0.2);
        assert!((0.0..=1.0).contains(&analysis.analysis_confidence));
        assert!(analysis.state.is_some());
    }

    #[tokio::test]
    async fn empty_user_id_is_invalid_input() {
        let (pipeline, _, _) = pipeline();
        let err = pipeline.analyze("", "s1", "hello", None).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn anxious_presentation_scenario_end_to_end() {
        let (pipeline, _, _) = pipeline();
        let turn = pipeline
            .analyze(
                "u1",
                "s1",
                "I feel very anxious about my upcoming presentation!",
                None,
            )
            .await
            .unwrap();

        let analysis = &turn.analysis;
        assert_eq!(analysis.rule_variables.source.value, MhhSource::Internal);
        assert_eq!(analysis.rule_variables.timeframe.value, MhhTimeframe::Future);
        assert_eq!(
            analysis.rule_variables.acceptance_state.value,
            MhhAcceptanceState::Resisted
        );

        // Negative valence, elevated arousal, reduced dominance.
        assert!(analysis.vad.valence < 0.0, "valence={}", analysis.vad.valence);
        assert!(analysis.vad.arousal > 0.6, "arousal={}", analysis.vad.arousal);
        assert!(analysis.vad.dominance < 0.5, "dominance={}", analysis.vad.dominance);

        assert!(matches!(
            turn.guidance.primary_dialogue_act,
            DialogueAct::OfferSupport | DialogueAct::DeEscalate
        ));
        assert!(turn
            .guidance
            .suggested_focus
            .iter()
            .any(|f| f == "Future Planning"));
        assert!(!turn.explanation.is_empty());
    }

    #[tokio::test]
    async fn happy_utterance_does_not_route_to_support() {
        let (pipeline, _, _) = pipeline();
        let turn = pipeline
            .analyze(
                "u1",
                "s1",
                "I'm so happy and excited, my presentation was wonderful!",
                None,
            )
            .await
            .unwrap();
        assert!(turn.analysis.vad.valence > 0.0);
        assert!(!matches!(
            turn.guidance.primary_dialogue_act,
            DialogueAct::OfferSupport | DialogueAct::DeEscalate | DialogueAct::ValidateEmotion
        ));
    }

    #[tokio::test]
    async fn attachments_activate_and_appear_in_the_bundle() {
        let (pipeline, store, _) = pipeline();
        store
            .upsert_attachment(
                "u1",
                &AttachmentNode {
                    id: "n1".into(),
                    name: "career".into(),
                    attachment_type: AttachmentType::Goal,
                    power_level: 8.0,
                    valence: 7.0,
                    certainty: 0.8,
                    embedding: None,
                },
                None,
            )
            .await
            .unwrap();

        let turn = pipeline
            .analyze("u1", "s1", "I am worried about my career", None)
            .await
            .unwrap();
        assert_eq!(turn.analysis.active_eps.len(), 1);
        assert_eq!(turn.analysis.active_eps[0].activation_weight, 1.0);
    }

    #[tokio::test]
    async fn rolling_state_carries_across_turns() {
        let (pipeline, _, _) = pipeline();
        let first = pipeline
            .analyze("u1", "s1", "Everything is terrible, I feel miserable and hopeless", None)
            .await
            .unwrap();
        let first_mood = first.analysis.state.unwrap().mood_estimate;
        assert!(first_mood < 0.0);

        // A neutral follow-up still carries negative mood inertia.
        let second = pipeline
            .analyze("u1", "s1", "The meeting got moved to Thursday", None)
            .await
            .unwrap();
        let second_mood = second.analysis.state.unwrap().mood_estimate;
        assert!(second_mood < 0.0, "mood={second_mood}");

        // A different session starts clean.
        let other = pipeline
            .analyze("u1", "s2", "The meeting got moved to Thursday", None)
            .await
            .unwrap();
        assert!(other.analysis.state.unwrap().mood_estimate > second_mood);
    }

    #[tokio::test]
    async fn durable_profile_state_seeds_the_first_turn() {
        let (pipeline, store, _) = pipeline();
        // No cached session state yet — the durable record must be picked up.
        store.seed_profiles(
            "u1",
            Some(crate::atoms::types::MinimalState {
                timestamp: chrono::Utc::now(),
                mood_estimate: -0.8,
                stress_estimate: 0.6,
            }),
            Some(crate::atoms::types::CulturalContext::default()),
            Some(crate::atoms::types::Personality::default()),
            Some("adult".into()),
        );

        let gloomy = pipeline
            .analyze("u1", "s1", "The meeting got moved to Thursday", None)
            .await
            .unwrap();
        let fresh = pipeline
            .analyze("u2", "s1", "The meeting got moved to Thursday", None)
            .await
            .unwrap();
        // Mood inertia from the durable record drags valence down.
        assert!(gloomy.analysis.vad.valence < fresh.analysis.vad.valence);
    }

    #[tokio::test]
    async fn caller_supplied_nlp_bundle_is_respected() {
        let (pipeline, _, _) = pipeline();
        let nlp = NlpFeatures {
            keywords: vec!["promotion".into()],
            sentiment: crate::atoms::types::Sentiment {
                label: SentimentLabel::Positive,
                score: 0.95,
            },
            ..NlpFeatures::neutral()
        };
        let turn = pipeline
            .analyze("u1", "s1", "Guess what happened at work", Some(nlp))
            .await
            .unwrap();
        assert!(turn.analysis.vad.valence > 0.0);
    }

    #[tokio::test]
    async fn self_map_round_trip_persists_values_and_goals() {
        let (pipeline, store, _) = pipeline();
        let (inferred, merged) = pipeline
            .infer_and_update_self_map(
                "u1",
                "My biggest goal is finishing my degree; I value honesty above all",
                None,
                Some("turn-1"),
            )
            .await
            .unwrap();
        assert!(!inferred.is_empty());
        assert!(merged > 0);
        assert_eq!(store.attachment_count("u1"), merged);
    }

    #[tokio::test]
    async fn analysis_confidence_matches_the_composition() {
        let (pipeline, _, _) = pipeline();
        let turn = pipeline
            .analyze("u1", "s1", "I feel anxious about tomorrow", None)
            .await
            .unwrap();
        let a = &turn.analysis;
        let expected = crate::engine::confidence::calculate_analysis_confidence(a);
        assert!((a.analysis_confidence - expected).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&a.analysis_confidence));
    }
}
