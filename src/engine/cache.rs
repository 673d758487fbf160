// ── EWEF Engine: In-Memory TTL Cache ───────────────────────────────────────
//
// Reference `EphemeralCache` implementation: a process-local map with lazy
// TTL eviction. Used by tests and by embedders that run without an external
// cache service. Expired entries are dropped on read and swept opportunistically
// on write.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::atoms::error::EngineResult;
use crate::atoms::traits::EphemeralCache;

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Process-local TTL cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.entries
            .read()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(entries: &mut HashMap<String, Entry>) {
        let now = Utc::now();
        entries.retain(|_, e| e.expires_at > now);
    }
}

#[async_trait]
impl EphemeralCache for MemoryCache {
    async fn get(&self, key: &str) -> EngineResult<Option<String>> {
        let now = Utc::now();
        // Fast path: read lock only.
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(e) if e.expires_at > now => return Ok(Some(e.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop it under the write lock.
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> EngineResult<()> {
        let mut entries = self.entries.write();
        Self::sweep(&mut entries);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Utc::now() + Duration::seconds(ttl_seconds as i64),
            },
        );
        Ok(())
    }
}
