// ── EWEF Engine: Context Analyzer ──────────────────────────────────────────
//
// Activates the subset of a user's durable attachments relevant to the
// current utterance and gathers the per-user profile modifiers.
//
// Activation rule:
//   • direct lexical match (name or any of its words vs. the utterance's
//     keywords/entities/concepts) → weight 1.0
//   • else semantic similarity above the activation threshold → weight =
//     that similarity
//   • else the attachment stays dormant this turn
//
// The profile sub-fetches (state, cultural, personality, developmental) are
// read-only and mutually independent, so they are issued concurrently.
// Failure of any sub-fetch is logged and treated as "profile absent" —
// nothing here ever propagates an error into the pipeline.

use log::{debug, warn};

use crate::atoms::constants::{ACTIVATION_SEARCH_TOP_K, ACTIVATION_SIMILARITY_THRESHOLD};
use crate::atoms::traits::{EmbeddingProvider, SelfMapStore};
use crate::atoms::types::{
    AttachmentNode, BootstrappedEp, CulturalContext, MinimalState, NlpFeatures, Personality,
    SocialContext,
};
use crate::engine::social::detect_social_context;
use std::collections::HashMap;

/// Everything the context analyzer hands to the appraisal stages.
#[derive(Debug, Clone, Default)]
pub struct MinimalContext {
    pub active_eps: Vec<BootstrappedEp>,
    pub user_state: Option<MinimalState>,
    pub cultural_context: Option<CulturalContext>,
    pub personality: Option<Personality>,
    pub developmental_stage: Option<String>,
    pub social_context: SocialContext,
}

/// Fetch and activate the minimal per-turn context for a user.
pub async fn get_minimal_context(
    store: &dyn SelfMapStore,
    embedder: Option<&dyn EmbeddingProvider>,
    user_id: &str,
    nlp: &NlpFeatures,
) -> MinimalContext {
    let social_context =
        detect_social_context(&nlp.keywords, &nlp.entities, &nlp.abstract_concepts);

    // One query for all bootstrappable attachments.
    let attachments = match store.fetch_attachments(user_id).await {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!("[ewef::context] attachment fetch failed for user {user_id}: {e}");
            Vec::new()
        }
    };

    // Profile sub-fetches are independent reads — issue them together.
    let (user_state, cultural_context, personality, developmental_stage) = tokio::join!(
        store.fetch_user_state(user_id),
        store.fetch_cultural_context(user_id),
        store.fetch_personality(user_id),
        store.fetch_developmental_stage(user_id),
    );
    let user_state = absent_on_error("state", user_id, user_state);
    let cultural_context = absent_on_error("cultural", user_id, cultural_context);
    let personality = absent_on_error("personality", user_id, personality);
    let developmental_stage = absent_on_error("developmental", user_id, developmental_stage);

    if attachments.is_empty() {
        return MinimalContext {
            active_eps: Vec::new(),
            user_state,
            cultural_context,
            personality,
            developmental_stage,
            social_context,
        };
    }

    // Semantic similarity scores, keyed by node id. Missing embedding or a
    // failed search just means no semantic activation this turn.
    let similarity_by_id = semantic_scores(store, embedder, user_id, nlp).await;

    let mut active_eps = Vec::new();
    for node in &attachments {
        let Some(ep_type) = node.attachment_type.as_ep_type() else {
            continue;
        };
        let weight = if direct_match(node, nlp) {
            Some(1.0)
        } else {
            similarity_by_id
                .get(node.id.as_str())
                .copied()
                .filter(|score| *score > ACTIVATION_SIMILARITY_THRESHOLD)
        };
        if let Some(activation_weight) = weight {
            active_eps.push(BootstrappedEp {
                id: node.id.clone(),
                name: node.name.clone(),
                ep_type,
                power_level: (node.power_level / 10.0).clamp(0.0, 1.0),
                valuation: (node.valence / 10.0).clamp(-1.0, 1.0),
                activation_weight: activation_weight.clamp(0.0, 1.0),
            });
        }
    }
    debug!(
        "[ewef::context] {} of {} attachments active for user {user_id}",
        active_eps.len(),
        attachments.len()
    );

    MinimalContext {
        active_eps,
        user_state,
        cultural_context,
        personality,
        developmental_stage,
        social_context,
    }
}

fn absent_on_error<T>(
    what: &str,
    user_id: &str,
    result: crate::atoms::error::EngineResult<Option<T>>,
) -> Option<T> {
    match result {
        Ok(v) => v,
        Err(e) => {
            warn!("[ewef::context] {what} profile fetch failed for user {user_id}: {e}");
            None
        }
    }
}

/// Run the vector search against the user's attachments, if an embedding can
/// be obtained. Returns node-id → similarity.
async fn semantic_scores(
    store: &dyn SelfMapStore,
    embedder: Option<&dyn EmbeddingProvider>,
    user_id: &str,
    nlp: &NlpFeatures,
) -> HashMap<String, f32> {
    let embedding = match &nlp.embedding {
        Some(e) => Some(e.clone()),
        None => match embedder {
            Some(client) => {
                let combined = combined_text(nlp);
                if combined.is_empty() {
                    None
                } else {
                    match client.embed(&combined).await {
                        Ok(e) => Some(e),
                        Err(e) => {
                            warn!("[ewef::context] utterance embedding failed: {e}");
                            None
                        }
                    }
                }
            }
            None => None,
        },
    };

    let Some(embedding) = embedding else {
        return HashMap::new();
    };

    match store
        .similar_attachments(user_id, &embedding, ACTIVATION_SEARCH_TOP_K)
        .await
    {
        Ok(scored) => scored
            .into_iter()
            .map(|(node, score)| (node.id, score))
            .collect(),
        Err(e) => {
            warn!("[ewef::context] similarity search failed for user {user_id}: {e}");
            HashMap::new()
        }
    }
}

fn combined_text(nlp: &NlpFeatures) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(nlp.keywords.iter().map(String::as_str));
    parts.extend(nlp.entities.iter().map(|e| e.text.as_str()));
    parts.extend(nlp.abstract_concepts.iter().map(String::as_str));
    parts.join(" ")
}

/// Case-insensitive lexical match: the attachment's name, or any word of it,
/// against any keyword/entity/concept (containment in either direction).
fn direct_match(node: &AttachmentNode, nlp: &NlpFeatures) -> bool {
    let name = node.name.to_lowercase();
    let mut tokens: Vec<&str> = vec![name.as_str()];
    tokens.extend(name.split_whitespace().filter(|w| w.len() >= 3));

    let mut items: Vec<String> = Vec::new();
    items.extend(nlp.keywords.iter().map(|k| k.to_lowercase()));
    items.extend(nlp.entities.iter().map(|e| e.text.to_lowercase()));
    items.extend(nlp.abstract_concepts.iter().map(|c| c.to_lowercase()));

    for token in tokens {
        for item in &items {
            if item == token || item.contains(token) || token.contains(item.as_str()) {
                return true;
            }
        }
    }
    false
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
