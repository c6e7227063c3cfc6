// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # PatternAnalyticsService — Graph Analytics over the Reasoning Bank
//!
//! Application service for the read-mostly half of the engine: similarity
//! edges, global mincut, cluster assignment, novelty scoring, PageRank and
//! usage-link derivation. All graph work happens on an in-process snapshot
//! of one domain; only `partition_patterns` and `build_links_from_trajectories`
//! write back.
//!
//! ## Degradation
//!
//! Read operations degrade to empty/default results when the store is
//! unreachable (the agent can keep reasoning without analytics). The
//! maintenance write paths propagate store failures instead of reporting
//! success they did not achieve.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::analytics::{
    mean_pairwise_weight, pagerank, pairwise_similarities, stoer_wagner, PageRankConfig,
    SimilarityPair, WeightedGraph,
};
use crate::domain::{
    Cluster, EngramEvent, MincutResult, NoveltyScore, PageRankEntry, Pattern, PatternId,
    SimilarityEdge, UsageLink,
};
use crate::infrastructure::PatternStore;

/// Default similarity threshold for edge derivation
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;
/// Default novelty cutoff: below this max-similarity a pattern is novel
pub const DEFAULT_NOVELTY_THRESHOLD: f64 = 0.5;

/// Event bus trait for publishing domain events
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: EngramEvent) -> Result<()>;
}

/// EventBus that emits events as structured tracing records. Default wiring
/// for the CLI and for deployments without an integration bus attached.
pub struct TracingEventBus;

#[async_trait]
impl EventBus for TracingEventBus {
    async fn publish(&self, event: EngramEvent) -> Result<()> {
        debug!(
            event_type = event.event_type(),
            payload = %serde_json::to_string(&event)?,
            "Domain event"
        );
        Ok(())
    }
}

/// Thresholds for a partitioning run.
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    /// Minimum similarity for an edge to enter the graph
    pub similarity_threshold: f64,
    /// Cuts cheaper than this split the domain into two clusters
    pub min_cut_threshold: f64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_cut_threshold: 0.5,
        }
    }
}

/// Service-level tunables not exposed as per-call parameters.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Similarity threshold for the PageRank transition graph
    pub similarity_threshold: f64,
    /// Lower threshold for the similarity fallback of the link builder
    pub linkage_threshold: f64,
    pub pagerank: PageRankConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            linkage_threshold: 0.2,
            pagerank: PageRankConfig::default(),
        }
    }
}

/// PatternAnalyticsService interface
#[async_trait]
pub trait PatternAnalyticsService: Send + Sync {
    /// Compute all same-domain similarity edges at or above the threshold
    async fn build_pattern_edges(
        &self,
        domain: &str,
        similarity_threshold: f64,
    ) -> Result<Vec<SimilarityEdge>>;

    /// Global weighted minimum cut of the domain's similarity graph
    async fn compute_mincut(
        &self,
        domain: &str,
        similarity_threshold: f64,
    ) -> Result<MincutResult>;

    /// Re-cluster a domain and persist the assignment
    async fn partition_patterns(
        &self,
        domain: &str,
        config: &PartitionConfig,
    ) -> Result<Vec<Cluster>>;

    /// Score a pattern's novelty against the domain's existing clusters
    async fn detect_novel_pattern(
        &self,
        pattern_id: PatternId,
        domain: &str,
        novelty_threshold: f64,
    ) -> Result<NoveltyScore>;

    /// PageRank importance for every pattern in the domain, descending
    async fn compute_pattern_pagerank(&self, domain: &str) -> Result<Vec<PageRankEntry>>;

    /// Derive directed usage links from trajectory co-occurrence, falling
    /// back to embedding similarity when no trajectories exist. Returns the
    /// number of links written.
    async fn build_links_from_trajectories(&self, domain: &str) -> Result<usize>;
}

/// Standard implementation of PatternAnalyticsService
pub struct StandardPatternAnalyticsService {
    store: Arc<dyn PatternStore>,
    event_bus: Arc<dyn EventBus>,
    config: AnalyticsConfig,
}

impl StandardPatternAnalyticsService {
    pub fn new(store: Arc<dyn PatternStore>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            store,
            event_bus,
            config: AnalyticsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AnalyticsConfig) -> Self {
        self.config = config;
        self
    }

    /// Load a domain snapshot, degrading to empty when the store is down.
    async fn domain_snapshot(&self, domain: &str) -> Vec<Pattern> {
        match self.store.load_domain_patterns(domain).await {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!(domain, error = %e, "Pattern store unavailable, degrading to empty snapshot");
                Vec::new()
            }
        }
    }

    fn pairs_to_edges(
        patterns: &[Pattern],
        pairs: &[SimilarityPair],
        domain: &str,
    ) -> Vec<SimilarityEdge> {
        pairs
            .iter()
            .map(|pair| SimilarityEdge {
                source_id: patterns[pair.source].id,
                target_id: patterns[pair.target].id,
                domain: domain.to_string(),
                similarity: pair.similarity,
            })
            .collect()
    }

    fn mincut_over(patterns: &[Pattern], pairs: &[SimilarityPair]) -> MincutResult {
        let n = patterns.len();
        if n < 2 {
            return MincutResult {
                cut_value: 0.0,
                partition_a: patterns.iter().map(|p| p.id).collect(),
                partition_b: Vec::new(),
            };
        }

        let graph = WeightedGraph::from_pairs(n, pairs);
        let outcome = stoer_wagner(&graph.capacity_matrix());

        let in_cut: Vec<bool> = {
            let mut side = vec![false; n];
            for &i in &outcome.partition {
                side[i] = true;
            }
            side
        };

        let partition_a: Vec<PatternId> = (0..n).filter(|&i| in_cut[i]).map(|i| patterns[i].id).collect();
        let partition_b: Vec<PatternId> = (0..n).filter(|&i| !in_cut[i]).map(|i| patterns[i].id).collect();

        MincutResult {
            cut_value: outcome.cut_value,
            partition_a,
            partition_b,
        }
    }
}

#[async_trait]
impl PatternAnalyticsService for StandardPatternAnalyticsService {
    async fn build_pattern_edges(
        &self,
        domain: &str,
        similarity_threshold: f64,
    ) -> Result<Vec<SimilarityEdge>> {
        let patterns = self.domain_snapshot(domain).await;
        if patterns.len() < 2 {
            return Ok(Vec::new());
        }

        let embeddings: Vec<Vec<f32>> = patterns.iter().map(|p| p.embedding.clone()).collect();
        let pairs = pairwise_similarities(&embeddings, similarity_threshold);

        debug!(domain, edge_count = pairs.len(), similarity_threshold, "Built similarity edges");

        Ok(Self::pairs_to_edges(&patterns, &pairs, domain))
    }

    async fn compute_mincut(
        &self,
        domain: &str,
        similarity_threshold: f64,
    ) -> Result<MincutResult> {
        let patterns = self.domain_snapshot(domain).await;

        let embeddings: Vec<Vec<f32>> = patterns.iter().map(|p| p.embedding.clone()).collect();
        let pairs = pairwise_similarities(&embeddings, similarity_threshold);

        Ok(Self::mincut_over(&patterns, &pairs))
    }

    async fn partition_patterns(
        &self,
        domain: &str,
        config: &PartitionConfig,
    ) -> Result<Vec<Cluster>> {
        // Maintenance path: store failures surface instead of degrading.
        let patterns = self.store.load_domain_patterns(domain).await?;
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings: Vec<Vec<f32>> = patterns.iter().map(|p| p.embedding.clone()).collect();
        // One unfiltered sweep: the graph keeps pairs at or above the
        // threshold, coherence uses the exact pairwise similarities.
        let all_pairs = pairwise_similarities(&embeddings, -1.0);
        let edge_pairs: Vec<SimilarityPair> = all_pairs
            .iter()
            .filter(|p| p.similarity >= config.similarity_threshold)
            .copied()
            .collect();

        let cut = Self::mincut_over(&patterns, &edge_pairs);

        let index_of: HashMap<PatternId, usize> = patterns
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        let member_sets: Vec<Vec<PatternId>> = if cut.splits_below(config.min_cut_threshold) {
            vec![cut.partition_a.clone(), cut.partition_b.clone()]
        } else {
            vec![patterns.iter().map(|p| p.id).collect()]
        };

        let mut clusters = Vec::with_capacity(member_sets.len());
        let mut assignments: Vec<(PatternId, i64)> = Vec::with_capacity(patterns.len());

        for (cluster_id, members) in member_sets.into_iter().enumerate() {
            let indices: Vec<usize> = members.iter().map(|id| index_of[id]).collect();
            let coherence_score = mean_pairwise_weight(&indices, &all_pairs);

            for id in &members {
                assignments.push((*id, cluster_id as i64));
            }
            clusters.push(Cluster {
                cluster_id: cluster_id as i64,
                pattern_ids: members,
                coherence_score,
            });
        }

        // Full assignment computed before any write (copy-on-write): readers
        // never observe a half-partitioned domain.
        self.store.assign_clusters(domain, &assignments).await?;

        info!(
            domain,
            cluster_count = clusters.len(),
            cut_value = cut.cut_value,
            "Partitioned domain patterns"
        );

        self.event_bus
            .publish(EngramEvent::PatternsPartitioned {
                domain: domain.to_string(),
                cluster_count: clusters.len(),
                cut_value: cut.cut_value,
                timestamp: Utc::now(),
            })
            .await?;

        Ok(clusters)
    }

    async fn detect_novel_pattern(
        &self,
        pattern_id: PatternId,
        domain: &str,
        novelty_threshold: f64,
    ) -> Result<NoveltyScore> {
        let unconditionally_novel = NoveltyScore {
            pattern_id,
            max_similarity: -1.0,
            nearest_cluster_id: None,
            is_novel: true,
        };

        let candidate = match self.store.find_pattern(pattern_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                debug!(?pattern_id, "Novelty check for unknown pattern, treating as novel");
                return Ok(unconditionally_novel);
            }
            Err(e) => {
                warn!(error = %e, "Pattern store unavailable, treating pattern as novel");
                return Ok(unconditionally_novel);
            }
        };

        let patterns = self.domain_snapshot(domain).await;

        let mut best_per_cluster: HashMap<i64, f64> = HashMap::new();
        for other in patterns.iter().filter(|p| p.id != pattern_id) {
            if let Some(cluster_id) = other.cluster_id {
                let similarity = crate::analytics::cosine_similarity(
                    &candidate.embedding,
                    &other.embedding,
                );
                let entry = best_per_cluster.entry(cluster_id).or_insert(f64::NEG_INFINITY);
                if similarity > *entry {
                    *entry = similarity;
                }
            }
        }

        // No cluster assignments in the domain: novel by definition.
        if best_per_cluster.is_empty() {
            return Ok(unconditionally_novel);
        }

        let Some((nearest_cluster_id, max_similarity)) = best_per_cluster
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        else {
            return Ok(unconditionally_novel);
        };

        Ok(NoveltyScore {
            pattern_id,
            max_similarity,
            nearest_cluster_id: Some(nearest_cluster_id),
            is_novel: max_similarity < novelty_threshold,
        })
    }

    async fn compute_pattern_pagerank(&self, domain: &str) -> Result<Vec<PageRankEntry>> {
        let patterns = self.domain_snapshot(domain).await;
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings: Vec<Vec<f32>> = patterns.iter().map(|p| p.embedding.clone()).collect();
        let pairs = pairwise_similarities(&embeddings, self.config.similarity_threshold);
        let graph = WeightedGraph::from_pairs(patterns.len(), &pairs);

        let importance = pagerank(&graph, &self.config.pagerank);

        let mut entries: Vec<PageRankEntry> = patterns
            .iter()
            .zip(importance)
            .map(|(pattern, importance)| PageRankEntry {
                pattern_id: pattern.id,
                importance,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(entries)
    }

    async fn build_links_from_trajectories(&self, domain: &str) -> Result<usize> {
        let trajectories = self.store.load_trajectories(domain).await?;

        let mut link_count = 0;
        let from_trajectories = !trajectories.is_empty();

        if from_trajectories {
            // occurrences(a) and co(a, b) over deduplicated trajectory membership
            let mut occurrences: HashMap<PatternId, usize> = HashMap::new();
            let mut co_occurrences: HashMap<(PatternId, PatternId), usize> = HashMap::new();

            for trajectory in &trajectories {
                let mut members = trajectory.pattern_ids.clone();
                members.sort_by_key(|id| id.0);
                members.dedup();

                for &id in &members {
                    *occurrences.entry(id).or_insert(0) += 1;
                }
                for &a in &members {
                    for &b in &members {
                        if a != b {
                            *co_occurrences.entry((a, b)).or_insert(0) += 1;
                        }
                    }
                }
            }

            // weight(a -> b) = co(a, b) / occurrences(a): the observed chance
            // that firing a is followed by reuse of b.
            for ((source_id, target_id), co) in &co_occurrences {
                let weight = *co as f64 / occurrences[source_id] as f64;
                self.store
                    .upsert_link(&UsageLink::new(*source_id, *target_id, domain, weight))
                    .await?;
                link_count += 1;
            }
        } else {
            // No trajectory data yet: seed links from embedding similarity
            // above the linkage threshold.
            let patterns = self.store.load_domain_patterns(domain).await?;
            let embeddings: Vec<Vec<f32>> = patterns.iter().map(|p| p.embedding.clone()).collect();
            let pairs = pairwise_similarities(&embeddings, self.config.linkage_threshold);

            for pair in &pairs {
                let a = patterns[pair.source].id;
                let b = patterns[pair.target].id;
                self.store
                    .upsert_link(&UsageLink::new(a, b, domain, pair.similarity))
                    .await?;
                self.store
                    .upsert_link(&UsageLink::new(b, a, domain, pair.similarity))
                    .await?;
                link_count += 2;
            }
        }

        info!(domain, link_count, from_trajectories, "Rebuilt usage links");

        self.event_bus
            .publish(EngramEvent::LinksRebuilt {
                domain: domain.to_string(),
                link_count,
                from_trajectories,
                timestamp: Utc::now(),
            })
            .await?;

        Ok(link_count)
    }
}
