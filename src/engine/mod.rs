// ── EWEF Engine Module ─────────────────────────────────────────────────────
//
// The emotion appraisal & core-affect pipeline, one file per stage:
//   - nlp: feature-bundle normalization + heuristic fallback extraction
//   - rule_variables: MHH appraisal-dimension inference (heuristic + LLM)
//   - social: guilt/pride/embarrassment scenario cues
//   - context: attachment activation + profile modifiers
//   - appraisal: perception appraisal with LLM→heuristic fallback chain
//   - vad: deterministic linear core-affect model
//   - categorize: MHH→emotion mapping with VAD-consistency check
//   - confidence: composite epistemic score
//   - state: rolling mood/stress with exponential time decay
//   - self_map: durable attachment inference + persistence
//   - guidance: dialogue-act decision table
//   - explain: metacognitive rationale string
//   - cache / store: in-memory reference collaborators

pub mod appraisal;
pub mod cache;
pub mod categorize;
pub mod confidence;
pub mod context;
pub mod explain;
pub mod guidance;
pub mod nlp;
pub mod pipeline;
pub mod rule_variables;
pub mod self_map;
pub mod social;
pub mod state;
pub mod store;
pub mod vad;

// Re-exports for convenience
pub use appraisal::{
    appraise_perception, AppraisalInput, Appraiser, FallbackChain, HeuristicAppraiser,
    LlmAppraiser,
};
pub use cache::MemoryCache;
pub use categorize::categorize_emotion;
pub use confidence::calculate_analysis_confidence;
pub use context::{get_minimal_context, MinimalContext};
pub use explain::generate_explanation;
pub use guidance::generate_interaction_guidance;
pub use nlp::{enrich_features_llm, extract_features_heuristic};
pub use pipeline::EwefPipeline;
pub use rule_variables::{infer_rule_variables, infer_rule_variables_llm};
pub use self_map::{
    infer_self_map_attachments, update_self_map, SelfMapOptions,
};
pub use social::{
    detect_social_context, embarrassment_likelihood, guilt_likelihood, pride_likelihood,
};
pub use state::{
    decay_state, read_minimal_state, update_minimal_state, Reaction, StateMonitorConfig,
};
pub use store::{cosine_similarity, MemorySelfMapStore};
pub use vad::calculate_linear_vad;
