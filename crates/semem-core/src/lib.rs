//! # Semem Core
//!
//! The memory core of Semem: a semantic memory substrate that records
//! `(prompt, response)` interactions together with their embedding and
//! extracted concepts, and retrieves the most contextually relevant prior
//! interactions for a new query.
//!
//! Four coupled subsystems compose the core:
//!
//! - a two-tier [`tiers::ShortTermTier`] / [`tiers::LongTermTier`]
//!   interaction store with a promotion policy,
//! - a hybrid [`ranker`] combining cosine similarity, concept overlap,
//!   temporal decay, and reinforcement,
//! - a [`concept_graph::ConceptGraph`] built online from ingested
//!   interactions,
//! - a pluggable [`storage::StorageBackend`] contract that preserves the
//!   in-memory invariants across restarts.
//!
//! Everything outside these boundaries — generating chat completions,
//! producing embeddings, extracting concepts from text, and formatting
//! prompts — is an external collaborator the core consumes through the
//! closures on [`manager::Manager::new`]. This crate never talks to a model
//! provider directly.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use semem_core::{EmbedFn, ConceptExtractFn, LlmFn, Manager, ManagerConfig};
//! use semem_core::storage::NullBackend;
//!
//! # async fn run() -> semem_core::Result<()> {
//! let embed_fn: EmbedFn = Arc::new(|_text: String| {
//!     Box::pin(async move { Ok(vec![0.0_f32; 1536]) })
//! });
//! let extract_fn: ConceptExtractFn = Arc::new(|_text: String| {
//!     Box::pin(async move { Ok(Default::default()) })
//! });
//! let llm_fn: LlmFn = Arc::new(|_ctx| {
//!     Box::pin(async move { Ok("generated reply".to_string()) })
//! });
//!
//! let mut manager = Manager::new(
//!     ManagerConfig::default(),
//!     embed_fn,
//!     extract_fn,
//!     llm_fn,
//!     Box::new(NullBackend::new()),
//! )?;
//! manager.init().await?;
//!
//! let now = 0;
//! manager.add_interaction("hello".into(), "hi there".into(), None, None, now).await?;
//! let hits = manager.retrieve_relevant("hello", 0.0, 0, 5, now).await?;
//! assert!(!hits.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod concept_graph;
pub mod config;
pub mod context;
pub mod error;
pub mod interaction;
pub mod manager;
pub mod ranker;
pub mod storage;
pub mod tiers;
pub mod vector;

pub use concept_graph::ConceptGraph;
pub use config::{ManagerConfig, RankingWeights};
pub use context::ContextPayload;
pub use error::{ExternalService, MemoryError, Result};
pub use interaction::Interaction;
pub use manager::{ConceptExtractFn, EmbedFn, LlmFn, Manager};
pub use ranker::Ranked;
pub use storage::{PersistedState, StorageBackend};
pub use tiers::TierKind;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        ConceptExtractFn, ConceptGraph, ContextPayload, EmbedFn, ExternalService, Interaction,
        LlmFn, Manager, ManagerConfig, MemoryError, Ranked, Result, StorageBackend, TierKind,
    };
}
