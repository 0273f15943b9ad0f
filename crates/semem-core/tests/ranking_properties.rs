//! Integration tests for the testable properties in the design spec: sorted
//! ranked output, threshold enforcement, boundary behaviors on an empty
//! store, `limit = 0`, and `exclude_last_n >= |ShortTerm|`.

use std::collections::BTreeSet;
use std::sync::Arc;

use semem_core::storage::NullBackend;
use semem_core::{ConceptExtractFn, EmbedFn, LlmFn, Manager, ManagerConfig};

fn fixed_embed(v: Vec<f32>) -> EmbedFn {
    Arc::new(move |_text: String| {
        let v = v.clone();
        Box::pin(async move { Ok(v) })
    })
}

fn concept_extractor(concepts: &'static [&'static str]) -> ConceptExtractFn {
    Arc::new(move |_text: String| {
        Box::pin(async move { Ok(concepts.iter().map(|s| s.to_string()).collect()) })
    })
}

fn no_llm() -> LlmFn {
    Arc::new(|_payload| Box::pin(async move { Ok("generated".to_string()) }))
}

async fn manager_with(config: ManagerConfig, embed: Vec<f32>, concepts: &'static [&'static str]) -> Manager {
    let mut manager = Manager::new(
        config,
        fixed_embed(embed),
        concept_extractor(concepts),
        no_llm(),
        Box::new(NullBackend::new()),
    )
    .unwrap();
    manager.init().await.unwrap();
    manager
}

#[tokio::test]
async fn empty_store_retrieval_returns_nothing() {
    let config = ManagerConfig {
        dimension: 4,
        ..ManagerConfig::default()
    };
    let mut manager = manager_with(config, vec![1.0; 4], &[]).await;
    let results = manager
        .retrieve_relevant("anything", 0.0, 0, 10, 0)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn limit_zero_returns_nothing_with_no_touch_side_effects() {
    let config = ManagerConfig {
        dimension: 4,
        ..ManagerConfig::default()
    };
    let mut manager = manager_with(config, vec![1.0, 0.0, 0.0, 0.0], &["a"]).await;
    manager
        .add_interaction(
            "p".into(),
            "o".into(),
            Some(vec![1.0, 0.0, 0.0, 0.0]),
            Some(["a".to_string()].into_iter().collect()),
            0,
        )
        .await
        .unwrap();

    let results = manager
        .retrieve_relevant("p", 0.0, 0, 0, 1)
        .await
        .unwrap();
    assert!(results.is_empty());

    // No touch side effect: a subsequent full retrieval still reports
    // access_count consistent with zero prior touches (reinforcement_pct
    // stays at its first-ingest floor rather than having grown).
    let second = manager.retrieve_relevant("p", 0.0, 0, 1, 2).await.unwrap();
    assert_eq!(second.len(), 1);
    let floor_reinforcement = second[0].reinforcement_pct;

    let third = manager.retrieve_relevant("p", 0.0, 0, 1, 3).await.unwrap();
    assert!(third[0].reinforcement_pct >= floor_reinforcement);
}

#[tokio::test]
async fn results_are_sorted_descending_and_respect_threshold() {
    let config = ManagerConfig {
        dimension: 4,
        short_term_capacity: 10,
        similarity_threshold_default: 0.0,
        ..ManagerConfig::default()
    };
    let mut manager = manager_with(config, vec![1.0, 0.0, 0.0, 0.0], &["a"]).await;

    let vectors: [(&str, Vec<f32>); 3] = [
        ("near", vec![0.9, 0.1, 0.0, 0.0]),
        ("far", vec![0.0, 0.0, 0.0, 1.0]),
        ("exact", vec![1.0, 0.0, 0.0, 0.0]),
    ];
    for (i, (prompt, embedding)) in vectors.iter().enumerate() {
        manager
            .add_interaction(
                prompt.to_string(),
                "o".into(),
                Some(embedding.clone()),
                Some(["a".to_string()].into_iter().collect()),
                i as i64,
            )
            .await
            .unwrap();
    }

    let results = manager
        .retrieve_relevant("exact", 60.0, 0, 10, 100)
        .await
        .unwrap();

    for w in results.windows(2) {
        assert!(w[0].final_score >= w[1].final_score);
    }
    for r in &results {
        assert!(r.final_score >= 60.0);
    }
    assert_eq!(results[0].prompt, "exact");
}

#[tokio::test]
async fn exclude_last_n_covering_all_short_term_scans_only_long_term() {
    let config = ManagerConfig {
        dimension: 4,
        short_term_capacity: 2,
        promotion_access_threshold: 1000, // never qualifies, forces eviction not promotion
        similarity_threshold_default: 0.0,
        ..ManagerConfig::default()
    };
    let mut manager = manager_with(config, vec![1.0, 0.0, 0.0, 0.0], &[]).await;

    manager
        .add_interaction(
            "p1".into(),
            "o".into(),
            Some(vec![1.0, 0.0, 0.0, 0.0]),
            Some(BTreeSet::new()),
            0,
        )
        .await
        .unwrap();
    manager
        .add_interaction(
            "p2".into(),
            "o".into(),
            Some(vec![1.0, 0.0, 0.0, 0.0]),
            Some(BTreeSet::new()),
            1,
        )
        .await
        .unwrap();

    // exclude_last_n exceeds short-term length; with nothing in long-term
    // yet, no candidates remain.
    let results = manager
        .retrieve_relevant("p1", 0.0, 100, 10, 2)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn threshold_100_only_keeps_near_perfect_matches() {
    let config = ManagerConfig {
        dimension: 4,
        short_term_capacity: 10,
        ranking_weights: (1.0, 0.0, 0.0, 0.0),
        ..ManagerConfig::default()
    };
    let mut manager = manager_with(config, vec![1.0, 0.0, 0.0, 0.0], &[]).await;

    manager
        .add_interaction(
            "exact".into(),
            "o".into(),
            Some(vec![1.0, 0.0, 0.0, 0.0]),
            Some(BTreeSet::new()),
            0,
        )
        .await
        .unwrap();
    manager
        .add_interaction(
            "off".into(),
            "o".into(),
            Some(vec![0.9, 0.1, 0.0, 0.0]),
            Some(BTreeSet::new()),
            1,
        )
        .await
        .unwrap();

    let results = manager
        .retrieve_relevant("exact", 100.0, 0, 10, 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].prompt, "exact");
}
