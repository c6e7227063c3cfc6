// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Pure analytics core: similarity sweep, arena graph, global mincut,
//! PageRank, and the LIF step rule. No I/O, no async — everything here is
//! unit-testable without a store.

pub mod similarity;
pub mod graph;
pub mod mincut;
pub mod pagerank;
pub mod lif;

pub use similarity::{cosine_similarity, pairwise_similarities, SimilarityPair};
pub use graph::{mean_pairwise_weight, WeightedGraph};
pub use mincut::{stoer_wagner, CutOutcome};
pub use pagerank::{pagerank, PageRankConfig};
pub use lif::{step, LifParams, LifStep};
