// ── EWEF Atoms: Error Types ────────────────────────────────────────────────
// Single canonical error enum for the appraisal engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by collaborator domain (LLM, Store, Cache…).
//   • Errors never cross a pipeline-stage boundary: each stage catches its
//     collaborator failures, logs them, and substitutes the documented
//     neutral default. `EngineError` exists for the seams (trait impls,
//     adapters), not for the hot path.
//   • No variant carries secret material (API keys, prompts with PII) in
//     its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// LLM gateway failure (transport, provider error, or refusal).
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM returned data that failed shape/schema validation.
    #[error("Malformed LLM output: {0}")]
    MalformedOutput(String),

    /// Durable graph-store failure (query, upsert, vector search).
    #[error("Store error: {0}")]
    Store(String),

    /// Ephemeral cache failure (get/set).
    #[error("Cache error: {0}")]
    Cache(String),

    /// Embedding provider failure.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller supplied structurally unusable input (empty user id, etc.).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Engine configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create an LLM error from any displayable cause.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a store error from any displayable cause.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a cache error from any displayable cause.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }
}

/// Engine-wide result alias.
pub type EngineResult<T> = Result<T, EngineError>;
