// ── EWEF Core ──────────────────────────────────────────────────────────────
//
// Emotion appraisal & core-affect engine. Converts one user utterance plus
// the user's accumulated psychological profile into:
//   • a continuous Valence/Arousal/Dominance estimate
//   • a discrete emotion label with a probability distribution
//   • an epistemic confidence score gating how much to trust the analysis
//   • an updated rolling mood/stress state
//   • a dialogue-policy recommendation and a human-readable rationale
// and, on a slower cadence, infers and persists the durable attachments
// (values, goals, needs, beliefs, interests) the user holds.
//
// Layering:
//   atoms/  — pure data: types, constants, errors, collaborator traits,
//             weight tables. No I/O, no engine imports.
//   engine/ — the pipeline stages, plus in-memory reference implementations
//             of the cache and store collaborators.
//
// Everything external (LLM gateway, embeddings, graph store, cache) sits
// behind the traits in `atoms::traits`; collaborator failure degrades to
// documented defaults instead of failing the turn.

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::traits::{
    EmbeddingProvider, EphemeralCache, LlmOptions, SelfMapStore, StructuredLlm, TextLlm,
};
pub use atoms::types::{
    AppraisalEstimate, AttachmentNode, AttachmentType, BootstrappedEp, CategoryScore,
    CulturalContext, DialogueAct, EmotionCategorization, Entity, EpType, EwefAnalysis,
    InferenceMethod, InferredAttachment, InteractionGuidance, MhhAcceptanceState,
    MhhPerspective, MhhSource, MhhTimeframe, MinimalState, NlpFeatures, PerceptionInstance,
    Personality, RuleVariable, RuleVariables, Sentiment, SentimentLabel, SocialContext,
    TurnAnalysis, VadOutput,
};
pub use atoms::weights::{DimensionWeights, VadWeights};
pub use engine::{
    calculate_analysis_confidence, calculate_linear_vad, categorize_emotion,
    generate_explanation, generate_interaction_guidance, EwefPipeline, MemoryCache,
    MemorySelfMapStore, MinimalContext, SelfMapOptions, StateMonitorConfig,
};
