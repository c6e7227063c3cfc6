// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end flow over one domain: edge derivation, mincut partitioning,
//! PageRank, link building and spike propagation against the in-memory
//! store.

use std::sync::Arc;

use engram_engine::application::{
    PartitionConfig, PatternAnalyticsService, SpikingNetworkService,
    StandardPatternAnalyticsService, StandardSpikingNetworkService, TracingEventBus,
};
use engram_engine::domain::{Pattern, PatternId, Trajectory};
use engram_engine::infrastructure::{InMemoryPatternStore, PatternStore};

const DOMAIN: &str = "finance";

/// Six patterns in three natural groups: three valuation-like, two
/// credit-like, one outlier pointing away from everything.
async fn seed_reasoning_bank(store: &InMemoryPatternStore) -> Vec<PatternId> {
    let embeddings: Vec<Vec<f32>> = vec![
        vec![1.0, 0.0, 0.0],    // valuation
        vec![0.95, 0.31, 0.0],  // valuation
        vec![0.92, -0.38, 0.0], // valuation
        vec![0.0, 0.0, 1.0],    // credit
        vec![0.0, 0.31, 0.95],  // credit
        vec![-0.57, -0.57, -0.57], // outlier
    ];

    let mut ids = Vec::new();
    for embedding in embeddings {
        let pattern = Pattern::new(DOMAIN, embedding, 0.9);
        ids.push(pattern.id);
        store.save_pattern(&pattern).await.unwrap();
    }
    ids
}

fn services(
    store: Arc<InMemoryPatternStore>,
) -> (StandardPatternAnalyticsService, StandardSpikingNetworkService) {
    let bus = Arc::new(TracingEventBus);
    (
        StandardPatternAnalyticsService::new(store.clone(), bus.clone()),
        StandardSpikingNetworkService::new(store, bus),
    )
}

#[tokio::test]
async fn edges_mincut_and_pagerank_over_the_bank() {
    let store = Arc::new(InMemoryPatternStore::new());
    let ids = seed_reasoning_bank(&store).await;
    let (analytics, _) = services(store);

    // A permissive threshold still yields edges, and every edge honors it
    let edges = analytics.build_pattern_edges(DOMAIN, 0.01).await.unwrap();
    assert!(!edges.is_empty());
    assert!(edges.iter().all(|e| e.similarity >= 0.01));

    // The default threshold drops the cross-group noise
    let strict = analytics.build_pattern_edges(DOMAIN, 0.3).await.unwrap();
    assert!(strict.len() <= edges.len());

    // Mincut covers the whole domain
    let cut = analytics.compute_mincut(DOMAIN, 0.3).await.unwrap();
    assert_eq!(cut.node_count(), ids.len());
    assert!(cut.cut_value >= 0.0);
    // The outlier is disconnected at 0.3, so some boundary is free
    assert!(cut.cut_value < 1e-9);

    // Every pattern gets an importance entry, sorted descending
    let ranked = analytics.compute_pattern_pagerank(DOMAIN).await.unwrap();
    assert_eq!(ranked.len(), ids.len());
    assert!(ranked.iter().all(|e| e.importance >= 0.0));
    assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
}

#[tokio::test]
async fn forced_partition_is_an_exact_two_way_split() {
    let store = Arc::new(InMemoryPatternStore::new());
    let ids = seed_reasoning_bank(&store).await;
    let (analytics, _) = services(store.clone());

    let clusters = analytics
        .partition_patterns(
            DOMAIN,
            &PartitionConfig {
                similarity_threshold: 0.3,
                min_cut_threshold: 10.0,
            },
        )
        .await
        .unwrap();

    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].cluster_id, 0);
    assert_eq!(clusters[1].cluster_id, 1);

    // Disjoint and covering
    let mut seen: Vec<PatternId> = clusters
        .iter()
        .flat_map(|c| c.pattern_ids.iter().copied())
        .collect();
    assert_eq!(seen.len(), ids.len());
    seen.sort_by_key(|id| id.0);
    seen.dedup();
    assert_eq!(seen.len(), ids.len());

    // Assignment landed on every stored pattern
    let stored = store.load_domain_patterns(DOMAIN).await.unwrap();
    assert!(stored.iter().all(|p| p.cluster_id.is_some()));
}

#[tokio::test]
async fn novelty_tracks_cluster_assignments() {
    let store = Arc::new(InMemoryPatternStore::new());
    seed_reasoning_bank(&store).await;
    let (analytics, _) = services(store.clone());

    // Before any partitioning, everything is novel by definition
    let fresh = Pattern::new(DOMAIN, vec![0.99, 0.1, 0.0], 0.9);
    store.save_pattern(&fresh).await.unwrap();
    let score = analytics
        .detect_novel_pattern(fresh.id, DOMAIN, 0.5)
        .await
        .unwrap();
    assert!(score.is_novel);
    assert!(score.nearest_cluster_id.is_none());

    analytics
        .partition_patterns(DOMAIN, &PartitionConfig::default())
        .await
        .unwrap();

    // Close to the valuation group: recognized, not novel
    let score = analytics
        .detect_novel_pattern(fresh.id, DOMAIN, 0.5)
        .await
        .unwrap();
    assert!(!score.is_novel);
    assert!(score.nearest_cluster_id.is_some());
    assert!(score.max_similarity > 0.75);

    // Pointing away from every cluster: novel
    let stranger = Pattern::new(DOMAIN, vec![0.0, 1.0, 0.0], 0.9);
    store.save_pattern(&stranger).await.unwrap();
    let score = analytics
        .detect_novel_pattern(stranger.id, DOMAIN, 0.5)
        .await
        .unwrap();
    assert!(score.is_novel);
}

#[tokio::test]
async fn spike_propagation_charges_cluster_mates_only() {
    let store = Arc::new(InMemoryPatternStore::new());
    let ids = seed_reasoning_bank(&store).await;
    let (analytics, spiking) = services(store.clone());

    let (v1, v2, v3, outlier) = (ids[0], ids[1], ids[2], ids[5]);

    // Trajectories over the valuation group: v2 and v3 each co-occur with
    // v1 in two of its three runs, so weight(v1 -> mate) = 2/3.
    for members in [vec![v1, v2, v3], vec![v1, v2], vec![v1, v3]] {
        store
            .save_trajectory(&Trajectory::new(DOMAIN, members))
            .await
            .unwrap();
    }
    let links = analytics.build_links_from_trajectories(DOMAIN).await.unwrap();
    assert!(links > 0);

    let events = spiking.fire_spike(v1).await.unwrap();

    // Source event plus one per linked cluster-mate
    assert_eq!(events.len(), 3);
    let source_event = &events[0];
    assert_eq!(source_event.pattern_id, v1);
    assert!(source_event.did_fire);
    assert_eq!(source_event.new_potential, 0.0);

    // Mates hold sub-threshold charge; the outlier is untouched
    for mate in [v2, v3] {
        let stored = store.find_pattern(mate).await.unwrap().unwrap();
        assert!(
            (stored.spike_potential - 2.0 / 3.0).abs() < 1e-9,
            "mate potential {}",
            stored.spike_potential
        );
    }
    let untouched = store.find_pattern(outlier).await.unwrap().unwrap();
    assert_eq!(untouched.spike_potential, 0.0);

    // The reporter sees the activity, reset clears it
    let state = spiking.get_network_state(DOMAIN).await.unwrap();
    assert_eq!(state.total_neurons, 6);
    assert_eq!(state.active_neurons, 2);
    assert_eq!(state.recent_spikes, 1);

    let reset = spiking.reset_network(DOMAIN).await.unwrap();
    assert_eq!(reset, 6);

    let state = spiking.get_network_state(DOMAIN).await.unwrap();
    assert_eq!(state.active_neurons, 0);
    assert_eq!(state.avg_potential, 0.0);
}
