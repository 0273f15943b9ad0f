//! Hybrid retrieval ranker (C6).
//!
//! Combines cosine similarity, concept overlap, temporal decay and
//! reinforcement into a single score on `[0, 100]`, grounded on
//! `linear_combination`-style normalize-and-weight-sum fusion and on a
//! tier/recency/lexical/embedding weighted blend this crate's signal set is
//! a direct structural cousin of.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::concept_graph::ConceptGraph;
use crate::config::RankingWeights;
use crate::interaction::Interaction;
use crate::vector::{cosine, cosine_to_pct};

/// A single scored candidate, with every component signal preserved for
/// callers that want to explain a ranking.
#[derive(Debug, Clone)]
pub struct Ranked {
    pub id: Uuid,
    pub prompt: String,
    pub output: String,
    pub concepts: BTreeSet<String>,
    pub final_score: f32,
    pub similarity_pct: f32,
    pub concept_pct: f32,
    pub decay_pct: f32,
    pub reinforcement_pct: f32,
    pub timestamp_ms: i64,
}

/// One retrieval candidate: the interaction plus whether it currently lives
/// in the short-term tier (only short-term items earn a reinforcement bonus).
pub struct Candidate<'a> {
    pub interaction: &'a Interaction,
    pub is_short_term: bool,
}

/// Scores and ranks `candidates` against `query_embedding`/`query_concepts`,
/// drops anything below `threshold_pct`, sorts descending by final score
/// (ties broken by newer `timestamp_ms`, then lexicographic `id`), and
/// truncates to `limit`.
#[allow(clippy::too_many_arguments)]
pub fn rank(
    query_embedding: &[f32],
    query_concepts: &BTreeSet<String>,
    candidates: impl Iterator<Item = Candidate<'_>>,
    graph: &ConceptGraph,
    concept_expand_k: usize,
    weights: RankingWeights,
    promotion_access_threshold: u32,
    threshold_pct: f32,
    limit: usize,
) -> crate::error::Result<Vec<Ranked>> {
    let (w_s, w_c, w_d, w_r) = weights;

    let mut scored = Vec::new();
    for candidate in candidates {
        let interaction = candidate.interaction;
        let sim = cosine(query_embedding, &interaction.embedding)?;
        let similarity_pct = cosine_to_pct(sim);
        let concept_pct =
            graph.overlap_score(query_concepts, &interaction.concepts, concept_expand_k) * 100.0;
        let decay_pct = interaction.decay_factor * 100.0;
        let reinforcement_pct = if candidate.is_short_term {
            interaction.reinforcement_pct(promotion_access_threshold)
        } else {
            0.0
        };

        let final_score =
            w_s * similarity_pct + w_c * concept_pct + w_d * decay_pct + w_r * reinforcement_pct;

        if final_score < threshold_pct {
            continue;
        }

        scored.push(Ranked {
            id: interaction.id,
            prompt: interaction.prompt.clone(),
            output: interaction.output.clone(),
            concepts: interaction.concepts.clone(),
            final_score,
            similarity_pct,
            concept_pct,
            decay_pct,
            reinforcement_pct,
            timestamp_ms: interaction.timestamp_ms,
        });
    }

    scored.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.timestamp_ms.cmp(&a.timestamp_ms))
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.truncate(limit);
    Ok(scored)
}
