// ── EWEF Engine: In-Memory Self-Map Store ──────────────────────────────────
//
// Reference `SelfMapStore` implementation backed by per-user maps with
// brute-force cosine similarity search. Used by tests and by embedders that
// run without a graph database. Nodes are keyed by `(name, type)` per user;
// upserts merge edge properties last-write-wins, matching the durable
// store's contract.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::atoms::error::EngineResult;
use crate::atoms::traits::SelfMapStore;
use crate::atoms::types::{
    AttachmentNode, AttachmentType, CulturalContext, MinimalState, Personality,
};

/// Cosine similarity mapped to [0,1] (negative correlations floor at 0).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        return 0.0;
    }
    (dot / (mag_a * mag_b)).clamp(0.0, 1.0)
}

#[derive(Default)]
struct UserRecord {
    /// (lowercased name, type) → node.
    attachments: HashMap<(String, AttachmentType), AttachmentNode>,
    state: Option<MinimalState>,
    cultural: Option<CulturalContext>,
    personality: Option<Personality>,
    developmental_stage: Option<String>,
}

/// Process-local self-map store.
#[derive(Default)]
pub struct MemorySelfMapStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemorySelfMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile record for tests and local bootstrapping.
    pub fn seed_profiles(
        &self,
        user_id: &str,
        state: Option<MinimalState>,
        cultural: Option<CulturalContext>,
        personality: Option<Personality>,
        developmental_stage: Option<String>,
    ) {
        let mut users = self.users.write();
        let record = users.entry(user_id.to_string()).or_default();
        record.state = state;
        record.cultural = cultural;
        record.personality = personality;
        record.developmental_stage = developmental_stage;
    }

    /// Number of attachment nodes stored for a user.
    pub fn attachment_count(&self, user_id: &str) -> usize {
        self.users
            .read()
            .get(user_id)
            .map(|r| r.attachments.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SelfMapStore for MemorySelfMapStore {
    async fn fetch_attachments(&self, user_id: &str) -> EngineResult<Vec<AttachmentNode>> {
        Ok(self
            .users
            .read()
            .get(user_id)
            .map(|r| {
                let mut nodes: Vec<AttachmentNode> = r
                    .attachments
                    .values()
                    .filter(|n| n.attachment_type.as_ep_type().is_some())
                    .cloned()
                    .collect();
                nodes.sort_by(|a, b| a.name.cmp(&b.name));
                nodes
            })
            .unwrap_or_default())
    }

    async fn similar_attachments(
        &self,
        user_id: &str,
        query: &[f32],
        top_k: usize,
    ) -> EngineResult<Vec<(AttachmentNode, f32)>> {
        let users = self.users.read();
        let Some(record) = users.get(user_id) else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<(AttachmentNode, f32)> = record
            .attachments
            .values()
            .filter_map(|node| {
                node.embedding
                    .as_ref()
                    .map(|e| (node.clone(), cosine_similarity(query, e)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn upsert_attachment(
        &self,
        user_id: &str,
        node: &AttachmentNode,
        _interaction_id: Option<&str>,
    ) -> EngineResult<()> {
        let mut users = self.users.write();
        let record = users.entry(user_id.to_string()).or_default();
        let key = (node.name.to_lowercase(), node.attachment_type);
        match record.attachments.get_mut(&key) {
            Some(existing) => {
                // Last write wins on the edge properties; keep the original
                // node id and any previously computed embedding.
                existing.power_level = node.power_level;
                existing.valence = node.valence;
                existing.certainty = node.certainty;
                if node.embedding.is_some() {
                    existing.embedding = node.embedding.clone();
                }
            }
            None => {
                record.attachments.insert(key, node.clone());
            }
        }
        Ok(())
    }

    async fn fetch_user_state(&self, user_id: &str) -> EngineResult<Option<MinimalState>> {
        Ok(self.users.read().get(user_id).and_then(|r| r.state))
    }

    async fn fetch_cultural_context(
        &self,
        user_id: &str,
    ) -> EngineResult<Option<CulturalContext>> {
        Ok(self.users.read().get(user_id).and_then(|r| r.cultural))
    }

    async fn fetch_personality(&self, user_id: &str) -> EngineResult<Option<Personality>> {
        Ok(self.users.read().get(user_id).and_then(|r| r.personality))
    }

    async fn fetch_developmental_stage(&self, user_id: &str) -> EngineResult<Option<String>> {
        Ok(self
            .users
            .read()
            .get(user_id)
            .and_then(|r| r.developmental_stage.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, attachment_type: AttachmentType, power: f32) -> AttachmentNode {
        AttachmentNode {
            id: format!("id-{name}"),
            name: name.into(),
            attachment_type,
            power_level: power,
            valence: 5.0,
            certainty: 0.8,
            embedding: None,
        }
    }

    #[tokio::test]
    async fn upsert_is_keyed_by_name_and_type() {
        let store = MemorySelfMapStore::new();
        store
            .upsert_attachment("u1", &node("honesty", AttachmentType::Value, 7.0), None)
            .await
            .unwrap();
        store
            .upsert_attachment("u1", &node("honesty", AttachmentType::Value, 9.0), None)
            .await
            .unwrap();
        // Same name, different type → distinct node.
        store
            .upsert_attachment("u1", &node("honesty", AttachmentType::Goal, 5.0), None)
            .await
            .unwrap();

        assert_eq!(store.attachment_count("u1"), 2);
        let nodes = store.fetch_attachments("u1").await.unwrap();
        let value_node = nodes
            .iter()
            .find(|n| n.attachment_type == AttachmentType::Value)
            .unwrap();
        // Last write won.
        assert_eq!(value_node.power_level, 9.0);
    }

    #[tokio::test]
    async fn fetch_returns_only_bootstrappable_types() {
        let store = MemorySelfMapStore::new();
        store
            .upsert_attachment("u1", &node("honesty", AttachmentType::Value, 7.0), None)
            .await
            .unwrap();
        store
            .upsert_attachment("u1", &node("astronomy", AttachmentType::Interest, 4.0), None)
            .await
            .unwrap();
        let nodes = store.fetch_attachments("u1").await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "honesty");
    }

    #[tokio::test]
    async fn similarity_search_ranks_by_cosine() {
        let store = MemorySelfMapStore::new();
        let mut close = node("career", AttachmentType::Goal, 6.0);
        close.embedding = Some(vec![1.0, 0.0]);
        let mut far = node("gardening", AttachmentType::Goal, 6.0);
        far.embedding = Some(vec![0.0, 1.0]);
        store.upsert_attachment("u1", &close, None).await.unwrap();
        store.upsert_attachment("u1", &far, None).await.unwrap();

        let results = store
            .similar_attachments("u1", &[1.0, 0.1], 10)
            .await
            .unwrap();
        assert_eq!(results[0].0.name, "career");
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        // Opposite vectors floor at 0 rather than going negative.
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
