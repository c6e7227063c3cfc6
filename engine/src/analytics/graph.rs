// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory weighted graph over arena indices.
//!
//! The analytics core never sees pattern ids or the repository: the
//! application layer maps a domain's patterns to indices 0..n, builds a
//! [`WeightedGraph`] from the similarity sweep, and maps results back.

use super::similarity::SimilarityPair;

/// Undirected weighted graph with adjacency lists over node indices 0..n.
#[derive(Debug, Clone)]
pub struct WeightedGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl WeightedGraph {
    pub fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
        }
    }

    /// Build from an undirected pair list. Pair indices must be < node_count.
    pub fn from_pairs(node_count: usize, pairs: &[SimilarityPair]) -> Self {
        let mut graph = Self::new(node_count);
        for pair in pairs {
            graph.add_edge(pair.source, pair.target, pair.similarity);
        }
        graph
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn add_edge(&mut self, a: usize, b: usize, weight: f64) {
        self.adjacency[a].push((b, weight));
        self.adjacency[b].push((a, weight));
    }

    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }

    /// Sum of incident edge weights.
    pub fn weighted_degree(&self, node: usize) -> f64 {
        self.adjacency[node].iter().map(|(_, w)| w).sum()
    }

    /// Dense symmetric capacity matrix, consumed by the mincut routine.
    pub fn capacity_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.node_count();
        let mut capacity = vec![vec![0.0f64; n]; n];
        // add_edge stores both directions, so each undirected edge lands
        // exactly once in [i][j] and once in [j][i].
        for (i, edges) in self.adjacency.iter().enumerate() {
            for &(j, w) in edges {
                capacity[i][j] += w;
            }
        }
        capacity
    }
}

/// Mean pairwise weight among `members`, looking weights up in the pair list.
/// Pairs with no recorded similarity count as 0. Returns 0.0 for fewer than
/// two members.
pub fn mean_pairwise_weight(members: &[usize], pairs: &[SimilarityPair]) -> f64 {
    if members.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    for pair in pairs {
        if members.contains(&pair.source) && members.contains(&pair.target) {
            total += pair.similarity;
        }
    }

    let pair_count = members.len() * (members.len() - 1) / 2;
    total / pair_count as f64
}
