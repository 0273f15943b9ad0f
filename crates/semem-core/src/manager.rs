//! Memory manager (C7) — orchestrates ingest, promotion, and retrieval; owns
//! the tiers, the concept graph, and the external collaborator handles.
//!
//! Grounded on an `EmbedFn`-injected async memory manager from a sibling
//! crate: external collaborators are `Arc<dyn Fn(...) -> BoxFuture<...> +
//! Send + Sync>` closures, so this crate never depends on a concrete
//! embedding, concept-extraction, or LLM provider.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::concept_graph::ConceptGraph;
use crate::config::ManagerConfig;
use crate::context::{self, ContextPayload};
use crate::error::{ExternalService, MemoryError, Result};
use crate::interaction::Interaction;
use crate::ranker::{self, Candidate, Ranked};
use crate::storage::StorageBackend;
use crate::tiers::{LongTermTier, Overflow, ShortTermTier, TierKind};
use crate::vector::standardize;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Computes an embedding for a piece of text. Fallible: returns `Err` with a
/// human-readable message on provider failure.
pub type EmbedFn =
    Arc<dyn Fn(String) -> BoxFuture<std::result::Result<Vec<f32>, String>> + Send + Sync>;

/// Extracts normalized concept terms from text. Fallible; a failure here
/// degrades to an empty concept set rather than aborting the caller.
pub type ConceptExtractFn =
    Arc<dyn Fn(String) -> BoxFuture<std::result::Result<BTreeSet<String>, String>> + Send + Sync>;

/// Generates a response from an assembled context payload.
pub type LlmFn =
    Arc<dyn Fn(ContextPayload) -> BoxFuture<std::result::Result<String, String>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Initializing,
    Ready,
    Disposing,
    Disposed,
}

/// Orchestrates the two-tier interaction store, the concept graph, and
/// retrieval against a pluggable [`StorageBackend`].
pub struct Manager {
    config: ManagerConfig,
    embed_fn: EmbedFn,
    extract_fn: ConceptExtractFn,
    llm_fn: LlmFn,
    backend: Box<dyn StorageBackend>,
    short_term: ShortTermTier,
    long_term: LongTermTier,
    graph: ConceptGraph,
    state: State,
    last_timestamp_ms: i64,
}

impl Manager {
    /// Constructs a manager in the `Uninitialized` state. Validates `config`
    /// eagerly so a misconfigured manager fails fast instead of on first use.
    pub fn new(
        config: ManagerConfig,
        embed_fn: EmbedFn,
        extract_fn: ConceptExtractFn,
        llm_fn: LlmFn,
        backend: Box<dyn StorageBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let short_term = ShortTermTier::new(config.short_term_capacity);
        Ok(Self {
            config,
            embed_fn,
            extract_fn,
            llm_fn,
            backend,
            short_term,
            long_term: LongTermTier::new(),
            graph: ConceptGraph::new(),
            state: State::Uninitialized,
            last_timestamp_ms: i64::MIN,
        })
    }

    fn require_ready(&self) -> Result<()> {
        if self.state != State::Ready {
            return Err(MemoryError::Disposed);
        }
        Ok(())
    }

    /// Loads persisted state from the backend into both tiers and
    /// reconstructs the concept graph. Partial failures abort the
    /// transition; the manager remains `Uninitialized`.
    pub async fn init(&mut self) -> Result<()> {
        if self.state != State::Uninitialized {
            return Err(MemoryError::InvalidArgument(
                "init() called outside Uninitialized state".into(),
            ));
        }
        self.state = State::Initializing;

        if !self.backend.verify().await? {
            self.state = State::Uninitialized;
            return Err(MemoryError::StorageError(
                "backend failed reachability check".into(),
            ));
        }

        let persisted = match self.backend.load().await {
            Ok(p) => p,
            Err(err) => {
                self.state = State::Uninitialized;
                return Err(err);
            }
        };

        self.long_term = LongTermTier::from_items(persisted.long_term);
        self.short_term =
            ShortTermTier::from_items(self.config.short_term_capacity, persisted.short_term);

        // Per §4.7, the concept graph is reconstructed from the concepts of
        // the loaded interactions rather than read back as its own persisted
        // structure — this keeps every backend's round-trip identical
        // without requiring each one to carry its own graph storage.
        let mut graph = ConceptGraph::new();
        for interaction in self.short_term.iter().chain(self.long_term.iter()) {
            graph.ingest(&interaction.concepts);
        }
        self.graph = graph;

        self.last_timestamp_ms = self
            .short_term
            .iter()
            .chain(self.long_term.iter())
            .map(|i| i.timestamp_ms)
            .max()
            .unwrap_or(i64::MIN);

        self.state = State::Ready;
        info!(
            short_term = self.short_term.len(),
            long_term = self.long_term.len(),
            concepts = self.graph.node_count(),
            "memory manager initialized"
        );
        Ok(())
    }

    /// Flushes pending writes and releases external handles. Idempotent.
    pub async fn dispose(&mut self) -> Result<()> {
        if self.state == State::Disposed {
            return Ok(());
        }
        self.state = State::Disposing;
        self.state = State::Disposed;
        info!("memory manager disposed");
        Ok(())
    }

    fn next_timestamp(&mut self, now_ms: i64) -> i64 {
        let clamped = if now_ms <= self.last_timestamp_ms {
            self.last_timestamp_ms + 1
        } else {
            now_ms
        };
        self.last_timestamp_ms = clamped;
        clamped
    }

    async fn call_embed(&self, text: String) -> Result<Vec<f32>> {
        let fut = (self.embed_fn)(text);
        match tokio::time::timeout(
            std::time::Duration::from_millis(self.config.external_call_timeout_ms),
            fut,
        )
        .await
        {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(message)) => Err(MemoryError::ExternalServiceError {
                which: ExternalService::Embed,
                message,
            }),
            Err(_) => Err(MemoryError::Timeout {
                which: ExternalService::Embed,
            }),
        }
    }

    async fn call_extract(&self, text: String) -> BTreeSet<String> {
        let fut = (self.extract_fn)(text);
        match tokio::time::timeout(
            std::time::Duration::from_millis(self.config.external_call_timeout_ms),
            fut,
        )
        .await
        {
            Ok(Ok(concepts)) => concepts,
            Ok(Err(message)) => {
                warn!(error = %message, "concept extraction failed, degrading to empty set");
                BTreeSet::new()
            }
            Err(_) => {
                warn!("concept extraction timed out, degrading to empty set");
                BTreeSet::new()
            }
        }
    }

    /// Records a new interaction. Computes embedding/concepts via the
    /// injected closures when not supplied, standardizes the embedding,
    /// appends to short-term (running the overflow policy if needed),
    /// ingests concepts into the graph, and persists via the backend. On any
    /// failure, both in-memory and durable state are left unchanged.
    pub async fn add_interaction(
        &mut self,
        prompt: String,
        output: String,
        embedding_opt: Option<Vec<f32>>,
        concepts_opt: Option<BTreeSet<String>>,
        now_ms: i64,
    ) -> Result<Uuid> {
        self.require_ready()?;

        let raw_embedding = match embedding_opt {
            Some(e) => e,
            None => {
                self.call_embed(format!("{prompt} {output}")).await?
            }
        };
        let embedding = if self.config.strict_dimension {
            if raw_embedding.len() != self.config.dimension {
                return Err(MemoryError::DimensionMismatch {
                    expected: self.config.dimension,
                    actual: raw_embedding.len(),
                });
            }
            raw_embedding
        } else {
            standardize(raw_embedding, self.config.dimension)
        };

        let concepts = match concepts_opt {
            Some(c) => c,
            None => self.call_extract(format!("{prompt} {output}")).await,
        };

        let timestamp = self.next_timestamp(now_ms);
        let interaction = Interaction::new(prompt, output, embedding, concepts.clone(), timestamp);
        let id = interaction.id;

        self.backend
            .append(&interaction, TierKind::ShortTerm)
            .await?;

        let high_freq = self
            .graph
            .high_frequency_concepts(self.config.high_frequency_concept_pct);
        let promotion_threshold = self.config.promotion_access_threshold;
        let predicate = |candidate: &Interaction| {
            candidate.access_count >= promotion_threshold
                || candidate
                    .concepts
                    .intersection(&high_freq)
                    .next()
                    .is_some()
        };

        match self.short_term.push_with_overflow(interaction, predicate) {
            Overflow::None => {
                debug!(%id, "interaction recorded in short-term tier");
            }
            Overflow::Promoted(promoted, pos) => {
                let promoted_id = promoted.id;
                if let Err(err) = self
                    .backend
                    .promote(promoted_id, TierKind::ShortTerm, TierKind::LongTerm)
                    .await
                {
                    // The overflow notification failed, so the whole call
                    // must be a no-op: undo the transfer (unless the new
                    // interaction was itself the one promoted, in which case
                    // there's nothing to reinsert), then undo the append
                    // that already landed durably.
                    if promoted_id != id {
                        self.short_term.insert_at(pos, promoted);
                        self.short_term.remove(id);
                    }
                    if let Err(purge_err) = self.backend.purge(id).await {
                        warn!(%id, error = %purge_err, "failed to undo append after promote failure");
                    }
                    return Err(err);
                }
                self.long_term.insert(promoted);
                info!(id = %promoted_id, "interaction promoted to long-term tier");
            }
            Overflow::Evicted(evicted, pos) => {
                let evicted_id = evicted.id;
                if let Err(err) = self.backend.purge(evicted_id).await {
                    // Same rollback requirement: the evicted item is never
                    // the new interaction itself (eviction always takes the
                    // oldest item, and the new one was just appended last),
                    // so both the reinsertion and the append-undo are needed.
                    self.short_term.insert_at(pos, evicted);
                    self.short_term.remove(id);
                    if let Err(purge_err) = self.backend.purge(id).await {
                        warn!(%id, error = %purge_err, "failed to undo append after evict-purge failure");
                    }
                    return Err(err);
                }
                info!(id = %evicted_id, "interaction evicted from short-term tier");
            }
        }

        self.graph.ingest(&concepts);
        Ok(id)
    }

    /// Recomputes `decay_factor` for every short-term item as of `now_ms`,
    /// without counting as an access.
    pub fn refresh_decay(&mut self, now_ms: i64) {
        self.short_term
            .refresh_decay(now_ms, self.config.decay_lambda_per_second);
    }

    /// Ranks candidates against `query`, drops anything below
    /// `threshold_pct`, sorts, and truncates to `limit`. Touches every
    /// returned candidate (observable side effect). `limit == 0` returns an
    /// empty result with no side effects.
    pub async fn retrieve_relevant(
        &mut self,
        query: &str,
        threshold_pct: f32,
        exclude_last_n: usize,
        limit: usize,
        now_ms: i64,
    ) -> Result<Vec<Ranked>> {
        self.require_ready()?;

        if limit == 0 {
            return Ok(Vec::new());
        }

        self.refresh_decay(now_ms);

        let raw_embedding = self.call_embed(query.to_string()).await?;
        let query_embedding = standardize(raw_embedding, self.config.dimension);
        let query_concepts = self.call_extract(query.to_string()).await;

        let excluded = self.short_term.excluded_ids(exclude_last_n);
        let excluded_set: BTreeSet<Uuid> = excluded.into_iter().collect();

        let short_term_candidates = self
            .short_term
            .iter()
            .filter(|i| !excluded_set.contains(&i.id))
            .map(|i| Candidate {
                interaction: i,
                is_short_term: true,
            });
        let long_term_candidates = self.long_term.iter().map(|i| Candidate {
            interaction: i,
            is_short_term: false,
        });

        let results = ranker::rank(
            &query_embedding,
            &query_concepts,
            short_term_candidates.chain(long_term_candidates),
            &self.graph,
            5,
            self.config.ranking_weights,
            self.config.promotion_access_threshold,
            threshold_pct,
            limit,
        )?;

        for ranked in &results {
            let lambda = self.config.decay_lambda_per_second;
            if let Some(item) = self.short_term.find_mut(ranked.id) {
                item.touch(now_ms, lambda);
                let (ac, la) = (item.access_count, item.last_access_ms);
                if let Err(err) = self.backend.update_access(ranked.id, ac, la).await {
                    warn!(id = %ranked.id, error = %err, "update_access failed, continuing (eventual consistency)");
                }
            } else if let Some(item) = self.long_term.get_mut(ranked.id) {
                item.touch(now_ms, lambda);
                let (ac, la) = (item.access_count, item.last_access_ms);
                if let Err(err) = self.backend.update_access(ranked.id, ac, la).await {
                    warn!(id = %ranked.id, error = %err, "update_access failed, continuing (eventual consistency)");
                }
            }
        }

        debug!(query, returned = results.len(), "retrieval completed");
        Ok(results)
    }

    /// Assembles a context payload and delegates generation to the external
    /// LLM collaborator. Does not itself store the generated interaction.
    pub async fn generate_response(
        &mut self,
        query: &str,
        history_override: Option<Vec<Interaction>>,
        retrieved_override: Option<Vec<Ranked>>,
    ) -> Result<String> {
        self.require_ready()?;

        let history = match history_override {
            Some(h) => h,
            None => self
                .short_term
                .recent(self.config.history_window)
                .into_iter()
                .cloned()
                .collect(),
        };

        let retrieved = match retrieved_override {
            Some(r) => r,
            None => Vec::new(),
        };

        let payload = context::assemble(query, &history, &retrieved, &self.config);

        let fut = (self.llm_fn)(payload);
        match tokio::time::timeout(
            std::time::Duration::from_millis(self.config.external_call_timeout_ms),
            fut,
        )
        .await
        {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(message)) => Err(MemoryError::ExternalServiceError {
                which: ExternalService::Llm,
                message,
            }),
            Err(_) => Err(MemoryError::Timeout {
                which: ExternalService::Llm,
            }),
        }
    }

    pub fn short_term_len(&self) -> usize {
        self.short_term.len()
    }

    pub fn long_term_len(&self) -> usize {
        self.long_term.len()
    }
}
