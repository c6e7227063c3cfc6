// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Weighted PageRank over the similarity graph.
//!
//! Transition weights are normalized per source node; nodes with no outgoing
//! weight (dangling) have their rank mass redistributed uniformly each
//! iteration, so the vector stays a probability distribution.

use super::graph::WeightedGraph;

#[derive(Debug, Clone)]
pub struct PageRankConfig {
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Iterate PageRank to convergence (L1 residual < tolerance) or the
/// iteration cap. Returns one non-negative importance per node; empty input
/// yields an empty vector.
pub fn pagerank(graph: &WeightedGraph, config: &PageRankConfig) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let uniform = 1.0 / n as f64;
    let degrees: Vec<f64> = (0..n).map(|i| graph.weighted_degree(i)).collect();

    let mut rank = vec![uniform; n];

    for _ in 0..config.max_iterations {
        let dangling_mass: f64 = (0..n)
            .filter(|&i| degrees[i] <= 0.0)
            .map(|i| rank[i])
            .sum();

        let base = (1.0 - config.damping) * uniform + config.damping * dangling_mass * uniform;
        let mut next = vec![base; n];

        for i in 0..n {
            if degrees[i] <= 0.0 {
                continue;
            }
            let share = config.damping * rank[i] / degrees[i];
            for &(j, w) in graph.neighbors(i) {
                next[j] += share * w;
            }
        }

        let residual: f64 = rank
            .iter()
            .zip(next.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();

        rank = next;

        if residual < config.tolerance {
            break;
        }
    }

    rank
}
