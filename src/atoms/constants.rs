// ── EWEF Atoms: Constants ──────────────────────────────────────────────────
// Engine-wide thresholds and defaults. Per-module tuning that should stay
// hot-configurable (state decay rates, VAD weights) lives in config structs
// instead — see `atoms::weights` and `engine::state::StateMonitorConfig`.

/// Semantic-similarity floor for attachment activation. An attachment with
/// no direct lexical match activates only if its embedding similarity to the
/// utterance exceeds this value.
pub const ACTIVATION_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Top-K for the vector search behind contextual attachment activation.
pub const ACTIVATION_SEARCH_TOP_K: usize = 20;

/// Default certainty floor for inferred self-map attachments.
pub const SELF_MAP_CERTAINTY_THRESHOLD: f32 = 0.3;

/// Default cap on inferred attachments returned per inference run.
pub const SELF_MAP_MAX_RESULTS: usize = 10;

/// Nominal downstream gate: analyses scoring below this are expected to be
/// handled with a safe acknowledgment by the calling policy layer. The
/// gating itself happens outside this crate.
pub const ANALYSIS_CONFIDENCE_GATE: f32 = 0.6;

/// Rule-variable confidence when a dimension matched nothing and fell back
/// to its default category.
pub const RULE_DEFAULT_CONFIDENCE: f32 = 0.6;

/// Rule-variable confidence when inference itself failed and the all-default
/// record was substituted.
pub const RULE_FAILURE_CONFIDENCE: f32 = 0.5;

/// Ceiling on lexically-derived rule-variable confidence.
pub const RULE_CONFIDENCE_CEILING: f32 = 0.9;

/// MHH confidence floor for a variable to be called out in explanations.
pub const EXPLANATION_MHH_CONFIDENCE: f32 = 0.7;

/// TTL for the per-(user, session) mood/stress state cache entry.
pub const STATE_CACHE_TTL_SECONDS: u64 = 6 * 60 * 60;

/// Heuristic keyword extraction: number of keywords kept.
pub const HEURISTIC_KEYWORD_LIMIT: usize = 10;
