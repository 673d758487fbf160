// ── EWEF Engine: State Monitor ─────────────────────────────────────────────
//
// Rolling per-(user, session) mood/stress estimate with exponential
// time-decay weighted inertia over recent reactions.
//
// The decay math is a pure function (`decay_state`) so it unit-tests without
// a live cache; persistence is a thin adapter on the `EphemeralCache` trait.
// Concurrent turns in the same session race read-modify-write last-write-wins
// — accepted and documented, not resolved here.
//
// Every tuning constant sits in `StateMonitorConfig`: these are unvalidated
// heuristics and must remain hot-configurable.

use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::atoms::constants::STATE_CACHE_TTL_SECONDS;
use crate::atoms::traits::EphemeralCache;
use crate::atoms::types::{MinimalState, VadOutput};

// ═══════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════

/// Tuning constants for the temporal dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateMonitorConfig {
    /// Exponential decay rate per second for reaction weights.
    pub decay_rate: f32,
    /// Only reactions within this window count toward inertia.
    pub window_minutes: i64,
    /// Hard cap on the number of reactions considered.
    pub max_reactions: usize,
    /// Multiplier applied to the previous mood estimate each update.
    pub mood_decay: f32,
    /// Multiplier applied to the previous stress estimate each update.
    pub stress_decay: f32,
    /// How strongly valence inertia moves the mood estimate.
    pub valence_weight: f32,
    /// How strongly arousal inertia moves the stress estimate.
    pub arousal_weight: f32,
    /// TTL for the cached state entry.
    pub cache_ttl_seconds: u64,
}

impl Default for StateMonitorConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.002,
            window_minutes: 60,
            max_reactions: 20,
            mood_decay: 0.8,
            stress_decay: 0.85,
            valence_weight: 0.3,
            arousal_weight: 0.25,
            cache_ttl_seconds: STATE_CACHE_TTL_SECONDS,
        }
    }
}

/// One affect reaction contributing to inertia.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub timestamp: DateTime<Utc>,
    pub valence: f32,
    pub arousal: f32,
}

// ═══════════════════════════════════════════════════════════════════════════
// Pure Decay Core
// ═══════════════════════════════════════════════════════════════════════════

/// Advance the rolling state: decay the previous estimates, then pull them
/// toward the exponentially-weighted inertia of recent reactions
/// (`weight = e^(−decay_rate·Δt_seconds)`).
pub fn decay_state(
    previous: &MinimalState,
    now: DateTime<Utc>,
    reactions: &[Reaction],
    config: &StateMonitorConfig,
) -> MinimalState {
    let window = Duration::minutes(config.window_minutes);

    // Newest first, window-filtered, capped.
    let mut recent: Vec<&Reaction> = reactions
        .iter()
        .filter(|r| {
            let age = now - r.timestamp;
            age >= Duration::zero() && age <= window
        })
        .collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(config.max_reactions);

    let mut weight_sum = 0.0_f32;
    let mut valence_sum = 0.0_f32;
    let mut arousal_sum = 0.0_f32;
    for r in &recent {
        let dt_seconds = (now - r.timestamp).num_milliseconds() as f32 / 1000.0;
        let weight = (-config.decay_rate * dt_seconds).exp();
        weight_sum += weight;
        valence_sum += r.valence.clamp(-1.0, 1.0) * weight;
        arousal_sum += r.arousal.clamp(0.0, 1.0) * weight;
    }

    let (valence_inertia, arousal_inertia) = if weight_sum > f32::EPSILON {
        (valence_sum / weight_sum, arousal_sum / weight_sum)
    } else {
        (0.0, 0.0)
    };

    MinimalState {
        timestamp: now,
        mood_estimate: (previous.mood_estimate * config.mood_decay
            + valence_inertia * config.valence_weight)
            .clamp(-1.0, 1.0),
        stress_estimate: (previous.stress_estimate * config.stress_decay
            + arousal_inertia * config.arousal_weight)
            .clamp(0.0, 1.0),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Cache Adapter
// ═══════════════════════════════════════════════════════════════════════════

/// Cache key for the per-(user, session) state entry.
pub fn state_cache_key(user_id: &str, session_id: &str) -> String {
    format!("ewef:state:{user_id}:{session_id}")
}

/// Read the cached state. `None` on miss, expiry, cache failure or a corrupt
/// entry — the caller supplies the zero default.
pub async fn read_minimal_state(
    cache: &dyn EphemeralCache,
    user_id: &str,
    session_id: &str,
) -> Option<MinimalState> {
    let key = state_cache_key(user_id, session_id);
    match cache.get(&key).await {
        Ok(Some(raw)) => match serde_json::from_str::<MinimalState>(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("[ewef::state] corrupt cached state for {key}: {e}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("[ewef::state] cache read failed for {key}: {e}");
            None
        }
    }
}

/// Fold this turn's VAD into the rolling state and persist it.
///
/// The cache write is best-effort: on failure the updated state is still
/// returned so the turn's bundle carries it.
pub async fn update_minimal_state(
    cache: &dyn EphemeralCache,
    user_id: &str,
    session_id: &str,
    vad: &VadOutput,
    previous: Option<MinimalState>,
    config: &StateMonitorConfig,
) -> MinimalState {
    let now = Utc::now();
    let previous = previous.unwrap_or_else(|| MinimalState::zero_at(now));
    let reaction = Reaction {
        timestamp: now,
        valence: vad.valence,
        arousal: vad.arousal,
    };
    let updated = decay_state(&previous, now, &[reaction], config);

    let key = state_cache_key(user_id, session_id);
    match serde_json::to_string(&updated) {
        Ok(raw) => {
            if let Err(e) = cache.set(&key, &raw, config.cache_ttl_seconds).await {
                warn!("[ewef::state] cache write failed for {key}: {e}");
            }
        }
        Err(e) => warn!("[ewef::state] state serialization failed: {e}"),
    }
    updated
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cache::MemoryCache;

    fn config() -> StateMonitorConfig {
        StateMonitorConfig::default()
    }

    #[test]
    fn zero_reactions_just_decay_the_previous_state() {
        let now = Utc::now();
        let previous = MinimalState {
            timestamp: now - Duration::minutes(5),
            mood_estimate: 0.5,
            stress_estimate: 0.4,
        };
        let updated = decay_state(&previous, now, &[], &config());
        assert!((updated.mood_estimate - 0.4).abs() < 1e-6);
        assert!((updated.stress_estimate - 0.34).abs() < 1e-6);
    }

    #[test]
    fn fresh_reaction_carries_full_weight() {
        let now = Utc::now();
        let previous = MinimalState::zero_at(now);
        let reactions = [Reaction {
            timestamp: now,
            valence: -1.0,
            arousal: 1.0,
        }];
        let updated = decay_state(&previous, now, &reactions, &config());
        // Δt = 0 → weight 1 → inertia equals the reaction itself.
        assert!((updated.mood_estimate + 0.3).abs() < 1e-6);
        assert!((updated.stress_estimate - 0.25).abs() < 1e-6);
    }

    #[test]
    fn older_reactions_weigh_exponentially_less() {
        let now = Utc::now();
        let previous = MinimalState::zero_at(now);
        // A fresh negative reaction and a 10-minute-old positive one.
        let reactions = [
            Reaction {
                timestamp: now,
                valence: -1.0,
                arousal: 0.8,
            },
            Reaction {
                timestamp: now - Duration::minutes(10),
                valence: 1.0,
                arousal: 0.0,
            },
        ];
        let updated = decay_state(&previous, now, &reactions, &config());
        // w_old = e^(−0.002·600) ≈ 0.301; inertia = (−1 + 0.301)/1.301 ≈ −0.537
        let expected_mood = -0.537_f32 * 0.3;
        assert!(
            (updated.mood_estimate - expected_mood).abs() < 0.01,
            "mood={}",
            updated.mood_estimate
        );
    }

    #[test]
    fn reactions_outside_the_window_are_ignored() {
        let now = Utc::now();
        let previous = MinimalState::zero_at(now);
        let reactions = [Reaction {
            timestamp: now - Duration::minutes(120),
            valence: 1.0,
            arousal: 1.0,
        }];
        let updated = decay_state(&previous, now, &reactions, &config());
        assert_eq!(updated.mood_estimate, 0.0);
        assert_eq!(updated.stress_estimate, 0.0);
    }

    #[test]
    fn reaction_cap_keeps_only_the_newest() {
        let now = Utc::now();
        let previous = MinimalState::zero_at(now);
        let mut cfg = config();
        cfg.max_reactions = 1;
        // The older, extreme reaction must be dropped by the cap.
        let reactions = [
            Reaction {
                timestamp: now - Duration::minutes(5),
                valence: 1.0,
                arousal: 1.0,
            },
            Reaction {
                timestamp: now,
                valence: 0.0,
                arousal: 0.0,
            },
        ];
        let updated = decay_state(&previous, now, &reactions, &cfg);
        assert_eq!(updated.mood_estimate, 0.0);
        assert_eq!(updated.stress_estimate, 0.0);
    }

    #[test]
    fn estimates_stay_clamped_under_extremes() {
        let now = Utc::now();
        let previous = MinimalState {
            timestamp: now,
            mood_estimate: -1.0,
            stress_estimate: 1.0,
        };
        let reactions = [Reaction {
            timestamp: now,
            valence: -1.0,
            arousal: 1.0,
        }];
        let updated = decay_state(&previous, now, &reactions, &config());
        assert!((-1.0..=1.0).contains(&updated.mood_estimate));
        assert!((0.0..=1.0).contains(&updated.stress_estimate));
    }

    #[tokio::test]
    async fn update_round_trips_through_the_cache() {
        let cache = MemoryCache::new();
        let vad = VadOutput::new(-0.8, 0.9, 0.3, 0.7);
        let written =
            update_minimal_state(&cache, "u1", "s1", &vad, None, &config()).await;
        let read = read_minimal_state(&cache, "u1", "s1").await.unwrap();
        assert_eq!(read, written);
        assert!(read.mood_estimate < 0.0);
        assert!(read.stress_estimate > 0.0);
    }

    #[tokio::test]
    async fn cache_miss_reads_as_none() {
        let cache = MemoryCache::new();
        assert!(read_minimal_state(&cache, "nobody", "nowhere").await.is_none());
    }

    #[tokio::test]
    async fn states_are_partitioned_by_user_and_session() {
        let cache = MemoryCache::new();
        let vad = VadOutput::new(0.5, 0.3, 0.6, 0.7);
        update_minimal_state(&cache, "u1", "s1", &vad, None, &config()).await;
        assert!(read_minimal_state(&cache, "u1", "s2").await.is_none());
        assert!(read_minimal_state(&cache, "u2", "s1").await.is_none());
        assert!(read_minimal_state(&cache, "u1", "s1").await.is_some());
    }
}
