//! Interaction record — the fundamental unit of memory (C2).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored `(prompt, output)` pair with its embedding, extracted concepts,
/// and access history.
///
/// Invariants upheld by this module: `embedding.len()` equals the manager's
/// configured dimension (enforced by the caller via
/// [`crate::vector::standardize`] before construction); `access_count >= 1`
/// after the first [`Interaction::touch`]; `0.0 < decay_factor <= 1.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub prompt: String,
    pub output: String,
    pub embedding: Vec<f32>,
    pub concepts: BTreeSet<String>,
    pub timestamp_ms: i64,
    pub access_count: u32,
    pub last_access_ms: i64,
    pub decay_factor: f32,
    /// Open extension point for caller-supplied tags. Nothing in this crate
    /// reads or writes keys here beyond round-tripping them through storage.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Interaction {
    /// Creates a new interaction with `access_count = 1` and
    /// `decay_factor = 1.0`, as happens on every ingest.
    pub fn new(
        prompt: impl Into<String>,
        output: impl Into<String>,
        embedding: Vec<f32>,
        concepts: BTreeSet<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            output: output.into(),
            embedding,
            concepts,
            timestamp_ms: now_ms,
            access_count: 1,
            last_access_ms: now_ms,
            decay_factor: 1.0,
            metadata: HashMap::new(),
        }
    }

    /// Records an access: bumps `access_count`, sets `last_access_ms`, and
    /// recomputes `decay_factor = exp(-lambda * age_seconds)` against the
    /// interaction's original `timestamp_ms`.
    pub fn touch(&mut self, now_ms: i64, decay_lambda_per_second: f32) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_access_ms = now_ms;
        self.decay_factor = self.decay_factor_at(now_ms, decay_lambda_per_second);
    }

    /// Recomputes decay as of `now_ms` without mutating access bookkeeping.
    /// Used by `refresh_decay` passes that must not count as an access.
    pub fn decay_factor_at(&self, now_ms: i64, decay_lambda_per_second: f32) -> f32 {
        let age_seconds = ((now_ms - self.timestamp_ms).max(0) as f32) / 1000.0;
        (-decay_lambda_per_second * age_seconds).exp()
    }

    /// Reinforcement bonus on `[0, 100]`, scaled by `access_count` relative
    /// to `promotion_access_threshold`. Only meaningful for short-term items;
    /// callers apply `0` for long-term candidates.
    pub fn reinforcement_pct(&self, promotion_access_threshold: u32) -> f32 {
        if promotion_access_threshold == 0 {
            return 100.0;
        }
        (self.access_count as f32 / promotion_access_threshold as f32).min(1.0) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concepts(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_interaction_starts_at_full_strength() {
        let i = Interaction::new("p", "o", vec![0.0; 4], concepts(&["a"]), 1_000);
        assert_eq!(i.access_count, 1);
        assert_eq!(i.decay_factor, 1.0);
        assert_eq!(i.last_access_ms, 1_000);
    }

    #[test]
    fn touch_increments_access_and_decays() {
        let mut i = Interaction::new("p", "o", vec![0.0; 4], concepts(&["a"]), 0);
        let lambda = 1.0 / (7.0 * 24.0 * 3600.0);
        i.touch(3600, lambda);
        assert_eq!(i.access_count, 2);
        assert_eq!(i.last_access_ms, 3600);
        assert!(i.decay_factor < 1.0 && i.decay_factor > 0.0);
    }

    #[test]
    fn decay_factor_at_does_not_mutate_access_count() {
        let i = Interaction::new("p", "o", vec![0.0; 4], concepts(&["a"]), 0);
        let lambda = 1.0 / (7.0 * 24.0 * 3600.0);
        let d = i.decay_factor_at(3600, lambda);
        assert_eq!(i.access_count, 1);
        assert!(d < 1.0);
    }

    #[test]
    fn reinforcement_caps_at_one_hundred() {
        let mut i = Interaction::new("p", "o", vec![0.0; 4], concepts(&["a"]), 0);
        for _ in 0..10 {
            i.touch(0, 0.0);
        }
        assert_eq!(i.reinforcement_pct(3), 100.0);
    }

    #[test]
    fn reinforcement_scales_linearly_below_threshold() {
        let i = Interaction::new("p", "o", vec![0.0; 4], concepts(&["a"]), 0);
        assert!((i.reinforcement_pct(3) - 100.0 / 3.0).abs() < 1e-4);
    }
}
