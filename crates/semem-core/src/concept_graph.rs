//! Online concept co-occurrence graph (C3).
//!
//! An undirected weighted graph built incrementally as interactions are
//! ingested: nodes are normalized concept strings, edges carry a
//! joint-frequency weight. Read-heavy during retrieval, write-light during
//! ingest; callers must uphold the manager's single-writer rule, this type
//! does no locking of its own.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Adjacency map `concept -> {neighbor -> weight}` plus a frequency map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConceptGraph {
    frequency: HashMap<String, u64>,
    adjacency: HashMap<String, BTreeMap<String, u64>>,
}

impl ConceptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.frequency.len()
    }

    pub fn frequency_of(&self, concept: &str) -> u64 {
        self.frequency.get(concept).copied().unwrap_or(0)
    }

    pub fn edge_weight(&self, a: &str, b: &str) -> u64 {
        self.adjacency
            .get(a)
            .and_then(|n| n.get(b))
            .copied()
            .unwrap_or(0)
    }

    /// Increments node frequency for every concept and edge weight for every
    /// unordered pair in the set. Self-edges are never created.
    pub fn ingest(&mut self, concepts: &BTreeSet<String>) {
        for c in concepts {
            *self.frequency.entry(c.clone()).or_insert(0) += 1;
        }
        let items: Vec<&String> = concepts.iter().collect();
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                self.bump_edge(items[i], items[j]);
            }
        }
    }

    fn bump_edge(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        *self
            .adjacency
            .entry(a.to_string())
            .or_default()
            .entry(b.to_string())
            .or_insert(0) += 1;
        *self
            .adjacency
            .entry(b.to_string())
            .or_default()
            .entry(a.to_string())
            .or_insert(0) += 1;
    }

    /// Returns up to `k` neighbors of `concept` ranked by
    /// `weight / sqrt(freq_a * freq_b)`, a hub-dampened co-occurrence score.
    pub fn related(&self, concept: &str, k: usize) -> Vec<(String, f32)> {
        let Some(neighbors) = self.adjacency.get(concept) else {
            return Vec::new();
        };
        let freq_a = self.frequency_of(concept) as f32;
        if freq_a <= 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<(String, f32)> = neighbors
            .iter()
            .map(|(neighbor, weight)| {
                let freq_b = self.frequency_of(neighbor) as f32;
                let denom = (freq_a * freq_b).sqrt();
                let score = if denom > 0.0 {
                    *weight as f32 / denom
                } else {
                    0.0
                };
                (neighbor.clone(), score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Jaccard overlap between `query_concepts` and `target_concepts`, with a
    /// one-hop expansion: if a target concept is among the top-`expand_k`
    /// neighbors of any query concept, it contributes a fractional credit
    /// equal to its normalized edge weight to that query concept. Clipped to
    /// `[0, 1]`. Empty sets on either side score `0`, never undefined.
    pub fn overlap_score(
        &self,
        query_concepts: &BTreeSet<String>,
        target_concepts: &BTreeSet<String>,
        expand_k: usize,
    ) -> f32 {
        if query_concepts.is_empty() || target_concepts.is_empty() {
            return 0.0;
        }

        let intersection = query_concepts.intersection(target_concepts).count();
        let union = query_concepts.union(target_concepts).count();
        let jaccard = if union > 0 {
            intersection as f32 / union as f32
        } else {
            0.0
        };

        let mut expansion_credit = 0.0_f32;
        for q in query_concepts {
            for (neighbor, weight) in self.related(q, expand_k) {
                if target_concepts.contains(&neighbor) {
                    expansion_credit += weight;
                }
            }
        }
        let normalized_expansion = if !query_concepts.is_empty() {
            expansion_credit / query_concepts.len() as f32
        } else {
            0.0
        };

        (jaccard + normalized_expansion).clamp(0.0, 1.0)
    }

    /// Concept nodes in the top `pct` percent by frequency, used by the
    /// short-term tier's promotion predicate.
    pub fn high_frequency_concepts(&self, pct: f32) -> BTreeSet<String> {
        if self.frequency.is_empty() {
            return BTreeSet::new();
        }
        let mut by_freq: Vec<(&String, &u64)> = self.frequency.iter().collect();
        by_freq.sort_by(|a, b| b.1.cmp(a.1));
        let take = ((by_freq.len() as f32 * pct / 100.0).ceil() as usize)
            .max(1)
            .min(by_freq.len());
        by_freq
            .into_iter()
            .take(take)
            .map(|(c, _)| c.clone())
            .collect()
    }

    /// Removes a concept entirely: its node frequency and every incident
    /// edge. Used by admin-level purge, never on the retrieval/ingest path.
    pub fn purge_concept(&mut self, concept: &str) {
        self.frequency.remove(concept);
        if let Some(neighbors) = self.adjacency.remove(concept) {
            for neighbor in neighbors.keys() {
                if let Some(n) = self.adjacency.get_mut(neighbor) {
                    n.remove(concept);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ingest_tracks_frequency_and_edges() {
        let mut g = ConceptGraph::new();
        g.ingest(&set(&["x", "y"]));
        g.ingest(&set(&["y", "z"]));

        assert_eq!(g.frequency_of("x"), 1);
        assert_eq!(g.frequency_of("y"), 2);
        assert_eq!(g.frequency_of("z"), 1);
        assert_eq!(g.edge_weight("x", "y"), 1);
        assert_eq!(g.edge_weight("y", "z"), 1);
        assert_eq!(g.edge_weight("x", "z"), 0);
    }

    #[test]
    fn related_ranks_by_dampened_weight() {
        let mut g = ConceptGraph::new();
        g.ingest(&set(&["x", "y"]));
        g.ingest(&set(&["y", "z"]));
        let neighbors = g.related("x", 1);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].0, "y");
    }

    #[test]
    fn empty_concept_sets_score_zero_not_undefined() {
        let g = ConceptGraph::new();
        assert_eq!(g.overlap_score(&BTreeSet::new(), &set(&["a"]), 5), 0.0);
        assert_eq!(g.overlap_score(&set(&["a"]), &BTreeSet::new(), 5), 0.0);
    }

    #[test]
    fn overlap_score_is_clipped_to_unit_interval() {
        let mut g = ConceptGraph::new();
        g.ingest(&set(&["a", "b"]));
        let score = g.overlap_score(&set(&["a", "b"]), &set(&["a", "b"]), 5);
        assert!(score <= 1.0);
    }

    #[test]
    fn no_self_edges() {
        let mut g = ConceptGraph::new();
        g.ingest(&set(&["a"]));
        assert_eq!(g.edge_weight("a", "a"), 0);
    }

    #[test]
    fn edge_weight_never_exceeds_min_endpoint_frequency() {
        let mut g = ConceptGraph::new();
        for _ in 0..3 {
            g.ingest(&set(&["a", "b"]));
        }
        g.ingest(&set(&["a", "c"]));
        assert!(g.edge_weight("a", "b") <= g.frequency_of("a").min(g.frequency_of("b")));
    }

    #[test]
    fn high_frequency_concepts_returns_top_slice() {
        let mut g = ConceptGraph::new();
        for _ in 0..10 {
            g.ingest(&set(&["common"]));
        }
        g.ingest(&set(&["rare"]));
        let top = g.high_frequency_concepts(50.0);
        assert!(top.contains("common"));
    }
}
