//! Manager configuration.
//!
//! Plain-data options, each with the default named in the design spec.
//! [`ManagerConfig::validate`] is called once by [`crate::manager::Manager::new`]
//! and rejects anything out of range before a single interaction is recorded.

use crate::error::{MemoryError, Result};

/// The four ranking signal weights `(similarity, concept, decay, reinforcement)`.
pub type RankingWeights = (f32, f32, f32, f32);

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Target embedding length. Every stored embedding is coerced to this
    /// length by [`crate::vector::standardize`] unless `strict_dimension`.
    pub dimension: usize,

    /// Capacity of the short-term tier before the overflow policy runs.
    pub short_term_capacity: usize,

    /// Minimum `access_count` for the promotion predicate's first rule.
    pub promotion_access_threshold: u32,

    /// Exponential decay rate per second used by [`crate::interaction::Interaction::touch`].
    pub decay_lambda_per_second: f32,

    /// `(w_similarity, w_concept, w_decay, w_reinforcement)`, must sum to `1 ± 1e-3`.
    pub ranking_weights: RankingWeights,

    /// Default `threshold_pct` passed to `retrieve_relevant` when the caller
    /// doesn't override it. Not enforced by the core itself — callers pass
    /// their own threshold to `retrieve_relevant`; this is just the value a
    /// hosting layer should default to.
    pub similarity_threshold_default: f32,

    /// Token budget for [`crate::context::assemble`].
    pub context_max_tokens: usize,

    /// Fraction of `context_max_tokens` reserved for recent history
    /// (the remainder goes to retrieved interactions).
    pub history_weight: f32,

    /// Timeout applied to every `embed_fn` / `extract_concepts_fn` / `llm_fn`
    /// / backend call.
    pub external_call_timeout_ms: u64,

    /// When `true`, embeddings whose length doesn't already match
    /// `dimension` are rejected with [`MemoryError::DimensionMismatch`]
    /// instead of being padded/truncated. The "refuse on mismatch" policy
    /// slot the design spec leaves open for implementers.
    pub strict_dimension: bool,

    /// Number of top concept nodes (by frequency, as a percentage of all
    /// nodes) considered "high frequency" for the promotion predicate's
    /// second rule. Default 5 (i.e. top 5%).
    pub high_frequency_concept_pct: f32,

    /// Number of recent short-term entries [`crate::context::assemble`]
    /// includes as conversational history.
    pub history_window: usize,

    /// Whether [`crate::context::assemble`] attaches each retrieved
    /// interaction's concept list to the context payload.
    pub include_concepts: bool,

    /// Whether [`crate::context::assemble`] drops retrievals whose prompt
    /// hash equals a history item's prompt hash.
    pub dedup_by_prompt_hash: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            dimension: 1536,
            short_term_capacity: 1000,
            promotion_access_threshold: 3,
            decay_lambda_per_second: 1.0 / (7.0 * 24.0 * 3600.0),
            ranking_weights: (0.55, 0.25, 0.15, 0.05),
            similarity_threshold_default: 40.0,
            context_max_tokens: 8192,
            history_weight: 0.3,
            external_call_timeout_ms: 60_000,
            strict_dimension: false,
            high_frequency_concept_pct: 5.0,
            history_window: 5,
            include_concepts: true,
            dedup_by_prompt_hash: true,
        }
    }
}

impl ManagerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(MemoryError::InvalidArgument(
                "dimension must be greater than 0".into(),
            ));
        }
        let (ws, wc, wd, wr) = self.ranking_weights;
        let sum = ws + wc + wd + wr;
        if (sum - 1.0).abs() > 1e-3 {
            return Err(MemoryError::InvalidArgument(format!(
                "ranking_weights must sum to 1.0, got {sum}"
            )));
        }
        if !(0.0..=100.0).contains(&self.similarity_threshold_default) {
            return Err(MemoryError::InvalidArgument(
                "similarity_threshold_default must be within [0, 100]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.history_weight) {
            return Err(MemoryError::InvalidArgument(
                "history_weight must be within [0, 1]".into(),
            ));
        }
        if self.short_term_capacity == 0 {
            return Err(MemoryError::InvalidArgument(
                "short_term_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
