// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Clustering and ranking value objects produced by the graph analytics side
//! of the engine.

use serde::{Deserialize, Serialize};
use super::pattern::PatternId;

/// One cluster of a domain's pattern set.
///
/// The clusters returned for a domain always partition it exactly: every
/// pattern appears in exactly one cluster, and ids are contiguous from 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: i64,
    pub pattern_ids: Vec<PatternId>,
    /// Mean pairwise cosine similarity among members. 0.0 for singletons.
    pub coherence_score: f64,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.pattern_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_ids.is_empty()
    }
}

/// Result of a global weighted minimum cut over a domain's similarity graph.
///
/// `partition_a` and `partition_b` together cover every node in the domain.
/// Degenerate graphs (0 or 1 node) have `cut_value` 0 with everything in
/// `partition_a`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MincutResult {
    pub cut_value: f64,
    pub partition_a: Vec<PatternId>,
    pub partition_b: Vec<PatternId>,
}

impl MincutResult {
    pub fn node_count(&self) -> usize {
        self.partition_a.len() + self.partition_b.len()
    }

    /// A cut below the threshold marks the graph as loosely connected enough
    /// to split into two clusters.
    pub fn splits_below(&self, min_cut_threshold: f64) -> bool {
        !self.partition_b.is_empty() && self.cut_value < min_cut_threshold
    }
}

/// Novelty verdict for a candidate pattern against the domain's clusters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoveltyScore {
    pub pattern_id: PatternId,
    /// Maximum cosine similarity to any already-clustered pattern, in [-1, 1].
    /// -1.0 when the domain has no clustered patterns at all.
    pub max_similarity: f64,
    pub nearest_cluster_id: Option<i64>,
    pub is_novel: bool,
}

/// Importance entry from PageRank over the similarity graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRankEntry {
    pub pattern_id: PatternId,
    pub importance: f64,
}
