//! Context assembler (C9) — turns recent history plus a ranked retrieval
//! list into a bounded, token-budgeted payload for the external LLM
//! collaborator.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::ManagerConfig;
use crate::interaction::Interaction;
use crate::ranker::Ranked;

/// Chars-per-token heuristic used to estimate a string's token cost without
/// a real tokenizer.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub prompt: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub prompt: String,
    pub output: String,
    pub score: f32,
    pub concepts: Option<Vec<String>>,
}

/// A bounded, token-budgeted context ready to hand to the external LLM
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPayload {
    pub query: String,
    pub history: Vec<HistoryItem>,
    pub retrieved: Vec<RetrievedItem>,
}

fn estimate_tokens(s: &str) -> usize {
    s.len().div_ceil(CHARS_PER_TOKEN)
}

fn prompt_hash(prompt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    prompt.hash(&mut hasher);
    hasher.finish()
}

fn history_item_tokens(item: &HistoryItem) -> usize {
    estimate_tokens(&item.prompt) + estimate_tokens(&item.output)
}

fn retrieved_item_tokens(item: &RetrievedItem) -> usize {
    let concept_tokens = item
        .concepts
        .as_ref()
        .map(|c| estimate_tokens(&c.join(" ")))
        .unwrap_or(0);
    estimate_tokens(&item.prompt) + estimate_tokens(&item.output) + concept_tokens
}

/// Builds a [`ContextPayload`] from `history` (most recent last) and
/// `retrieved` (already ranked descending). Drops lowest-ranked retrievals
/// until the estimated token count fits `config.context_max_tokens`, split
/// `history_weight` / `1 - history_weight` between history and retrievals.
/// When `dedup_by_prompt_hash`, retrievals whose prompt hash matches a
/// history item are dropped before budgeting.
pub fn assemble(
    query: &str,
    history: &[Interaction],
    retrieved: &[Ranked],
    config: &ManagerConfig,
) -> ContextPayload {
    let history_items: Vec<HistoryItem> = history
        .iter()
        .map(|i| HistoryItem {
            prompt: i.prompt.clone(),
            output: i.output.clone(),
        })
        .collect();

    let history_hashes: std::collections::HashSet<u64> = history_items
        .iter()
        .map(|h| prompt_hash(&h.prompt))
        .collect();

    let retrieved_items: Vec<RetrievedItem> = retrieved
        .iter()
        .filter(|r| !config.dedup_by_prompt_hash || !history_hashes.contains(&prompt_hash(&r.prompt)))
        .map(|r| RetrievedItem {
            prompt: r.prompt.clone(),
            output: r.output.clone(),
            score: r.final_score,
            concepts: config
                .include_concepts
                .then(|| r.concepts.iter().cloned().collect()),
        })
        .collect();

    let history_budget = (config.context_max_tokens as f32 * config.history_weight) as usize;
    let retrieval_budget = config.context_max_tokens.saturating_sub(history_budget);

    let mut trimmed_history = Vec::new();
    let mut used = 0usize;
    for item in history_items.into_iter().rev() {
        let cost = history_item_tokens(&item);
        if used + cost > history_budget && !trimmed_history.is_empty() {
            break;
        }
        used += cost;
        trimmed_history.push(item);
    }
    trimmed_history.reverse();

    let mut used = 0usize;
    let mut kept = Vec::new();
    for item in retrieved_items.into_iter() {
        let cost = retrieved_item_tokens(&item);
        if used + cost > retrieval_budget {
            continue;
        }
        used += cost;
        kept.push(item);
    }

    ContextPayload {
        query: query.to_string(),
        history: trimmed_history,
        retrieved: kept,
    }
}
