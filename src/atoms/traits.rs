// ── EWEF Atoms: Collaborator Contracts ─────────────────────────────────────
// The engine consumes every external dependency through these traits.
// Implementations live outside the crate (HTTP gateways, graph databases,
// Redis) or in `engine::cache` / `engine::store` for the in-memory variants.
//
// Failure policy: trait methods return `EngineResult`, but no pipeline stage
// lets a collaborator `Err` escape — each stage logs and substitutes its
// documented neutral default. Callers relying on LLM paths must impose their
// own timeout/cancellation; the core enforces none.

use async_trait::async_trait;
use serde_json::Value;

use crate::atoms::error::EngineResult;
use crate::atoms::types::{AttachmentNode, CulturalContext, MinimalState, Personality};

// ── LLM gateways ───────────────────────────────────────────────────────────

/// Per-call options forwarded to the LLM gateway.
#[derive(Debug, Clone, Default)]
pub struct LlmOptions {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Structured-object generation: the gateway is expected to return JSON
/// matching the schema described in the prompt. Shape validation happens on
/// this side of the seam — malformed output triggers heuristic fallback.
#[async_trait]
pub trait StructuredLlm: Send + Sync {
    async fn generate_structured(&self, prompt: &str, opts: &LlmOptions) -> EngineResult<Value>;
}

/// Plain text generation. Carried for prompt-based NER/ZSC extraction whose
/// JSON output the self-map candidate generators consume.
#[async_trait]
pub trait TextLlm: Send + Sync {
    async fn generate_text(&self, prompt: &str, opts: &LlmOptions) -> EngineResult<String>;
}

// ── Embeddings ─────────────────────────────────────────────────────────────

/// Text embedding provider. Similarity is computed locally (cosine).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;
}

// ── Durable graph store ────────────────────────────────────────────────────

/// The durable self-map store: attachment nodes keyed by `(name, type)` with
/// per-user edge properties, plus the optional user profile records.
#[async_trait]
pub trait SelfMapStore: Send + Sync {
    /// All Value/Goal/Need attachments held by the user (single query).
    async fn fetch_attachments(&self, user_id: &str) -> EngineResult<Vec<AttachmentNode>>;

    /// Vector similarity search over the user's attachment nodes.
    /// Returns `(node, similarity)` pairs, best first.
    async fn similar_attachments(
        &self,
        user_id: &str,
        query: &[f32],
        top_k: usize,
    ) -> EngineResult<Vec<(AttachmentNode, f32)>>;

    /// Upsert a `(name, type)` node and merge the per-user edge properties
    /// (last-write-wins).
    async fn upsert_attachment(
        &self,
        user_id: &str,
        node: &AttachmentNode,
        interaction_id: Option<&str>,
    ) -> EngineResult<()>;

    /// Most recent durable mood/stress record, if any.
    async fn fetch_user_state(&self, user_id: &str) -> EngineResult<Option<MinimalState>>;

    /// Cultural profile, if one exists.
    async fn fetch_cultural_context(&self, user_id: &str)
        -> EngineResult<Option<CulturalContext>>;

    /// Five-factor personality profile, if one exists.
    async fn fetch_personality(&self, user_id: &str) -> EngineResult<Option<Personality>>;

    /// Developmental-stage label, if one exists.
    async fn fetch_developmental_stage(&self, user_id: &str) -> EngineResult<Option<String>>;
}

// ── Ephemeral cache ────────────────────────────────────────────────────────

/// TTL-bounded string cache for the rolling session state.
/// `get` returns `Ok(None)` on miss or expiry — never an error for absence.
#[async_trait]
pub trait EphemeralCache: Send + Sync {
    async fn get(&self, key: &str) -> EngineResult<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> EngineResult<()>;
}
