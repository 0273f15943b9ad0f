//! Benchmarks for the memory core's hot paths: vector ops, concept-graph
//! lookups, and the end-to-end hybrid ranker over a short-term-sized corpus.
//! Run with: cargo bench -p semem-core

use std::collections::BTreeSet;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use semem_core::ConceptGraph;
use semem_core::ranker::{self, Candidate};
use semem_core::vector::{cosine, l2_normalize, standardize};
use semem_core::{Interaction, ManagerConfig};

fn bench_cosine_1536d(c: &mut Criterion) {
    let a: Vec<f32> = (0..1536).map(|i| (i as f32).sin()).collect();
    let b: Vec<f32> = (0..1536).map(|i| (i as f32).cos()).collect();

    c.bench_function("cosine_1536d", |bencher| {
        bencher.iter(|| black_box(cosine(&a, &b).unwrap()));
    });
}

fn bench_standardize_pad(c: &mut Criterion) {
    let v: Vec<f32> = (0..384).map(|i| i as f32).collect();
    c.bench_function("standardize_pad_384_to_1536", |bencher| {
        bencher.iter(|| black_box(standardize(v.clone(), 1536)));
    });
}

fn bench_l2_normalize_1536d(c: &mut Criterion) {
    c.bench_function("l2_normalize_1536d", |bencher| {
        bencher.iter_batched(
            || (0..1536).map(|i| (i as f32).sin() * 3.0).collect::<Vec<_>>(),
            |mut v| {
                l2_normalize(&mut v);
                black_box(v);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_concept_graph_ingest(c: &mut Criterion) {
    let concept_sets: Vec<BTreeSet<String>> = (0..100)
        .map(|i| {
            (0..5)
                .map(|j| format!("concept-{}", (i + j) % 30))
                .collect()
        })
        .collect();

    c.bench_function("concept_graph_ingest_100x5", |bencher| {
        bencher.iter_batched(
            ConceptGraph::new,
            |mut graph| {
                for set in &concept_sets {
                    graph.ingest(black_box(set));
                }
                black_box(graph);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_overlap_score(c: &mut Criterion) {
    let mut graph = ConceptGraph::new();
    for i in 0..200 {
        let set: BTreeSet<String> = (0..4)
            .map(|j| format!("concept-{}", (i + j) % 40))
            .collect();
        graph.ingest(&set);
    }
    let query: BTreeSet<String> = ["concept-1", "concept-2"].iter().map(|s| s.to_string()).collect();
    let target: BTreeSet<String> = ["concept-2", "concept-3"].iter().map(|s| s.to_string()).collect();

    c.bench_function("concept_graph_overlap_score", |bencher| {
        bencher.iter(|| black_box(graph.overlap_score(&query, &target, 5)));
    });
}

fn bench_rank_short_term_capacity(c: &mut Criterion) {
    let dimension = 384;
    let config = ManagerConfig {
        dimension,
        ..ManagerConfig::default()
    };

    let interactions: Vec<Interaction> = (0..1000)
        .map(|i| {
            let embedding: Vec<f32> = (0..dimension).map(|d| ((i + d) as f32).sin()).collect();
            let concepts: BTreeSet<String> = [format!("concept-{}", i % 20)].into_iter().collect();
            Interaction::new(format!("prompt-{i}"), "output", embedding, concepts, i as i64)
        })
        .collect();

    let graph = ConceptGraph::new();
    let query_embedding: Vec<f32> = (0..dimension).map(|d| (d as f32).cos()).collect();
    let query_concepts: BTreeSet<String> = ["concept-7".to_string()].into_iter().collect();

    c.bench_function("rank_1000_short_term_candidates", |bencher| {
        bencher.iter(|| {
            let candidates = interactions.iter().map(|i| Candidate {
                interaction: i,
                is_short_term: true,
            });
            black_box(
                ranker::rank(
                    &query_embedding,
                    &query_concepts,
                    candidates,
                    &graph,
                    5,
                    config.ranking_weights,
                    config.promotion_access_threshold,
                    config.similarity_threshold_default,
                    10,
                )
                .unwrap(),
            )
        });
    });
}

criterion_group!(
    benches,
    bench_cosine_1536d,
    bench_standardize_pad,
    bench_l2_normalize_1536d,
    bench_concept_graph_ingest,
    bench_overlap_score,
    bench_rank_short_term_capacity,
);
criterion_main!(benches);
