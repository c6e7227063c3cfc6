// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Pattern aggregate and the link/trajectory records derived from agent
//! reasoning traces.
//!
//! A [`Pattern`] is a stored, embedded fingerprint of a previously successful
//! tool-use sequence. Patterns are created by the trace recorder upstream;
//! this engine only mutates the fields it owns (`cluster_id`,
//! `spike_potential`, `last_fired_at`, `usage_count`) and never deletes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub Uuid);

impl PatternId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrajectoryId(pub Uuid);

impl TrajectoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrajectoryId {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored tool-use pattern with its embedding and spiking state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    /// Namespace partitioning patterns by task category. Graph and cluster
    /// operations never mix domains.
    pub domain: String,
    /// Pre-computed fixed-dimension embedding, expected unit-normalized.
    pub embedding: Vec<f32>,
    /// Assigned by `partition_patterns`; None until first partitioning.
    pub cluster_id: Option<i64>,
    /// LIF membrane potential, >= 0. Mutated only through the spiking service.
    pub spike_potential: f64,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl Pattern {
    pub fn new(domain: impl Into<String>, embedding: Vec<f32>, confidence: f64) -> Self {
        Self {
            id: PatternId::new(),
            domain: domain.into(),
            embedding,
            cluster_id: None,
            spike_potential: 0.0,
            last_fired_at: None,
            usage_count: 0,
            confidence,
            created_at: Utc::now(),
        }
    }

    /// A neuron is active while it carries residual membrane potential.
    pub fn is_active(&self) -> bool {
        self.spike_potential > 0.0
    }
}

/// Derived similarity edge between two same-domain patterns.
///
/// Never persisted as ground truth: recomputed from embeddings on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub source_id: PatternId,
    pub target_id: PatternId,
    pub domain: String,
    pub similarity: f64,
}

/// Directed propagation link between patterns, persisted and used by the
/// spiking network to carry activation one hop downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLink {
    pub source_id: PatternId,
    pub target_id: PatternId,
    pub domain: String,
    pub weight: f64,
}

impl UsageLink {
    pub fn new(source_id: PatternId, target_id: PatternId, domain: impl Into<String>, weight: f64) -> Self {
        Self {
            source_id,
            target_id,
            domain: domain.into(),
            weight,
        }
    }
}

/// Co-occurrence record written by the reasoning-trace recorder when a
/// trajectory completes successfully. Read-only input to the link builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: TrajectoryId,
    pub domain: String,
    pub pattern_ids: Vec<PatternId>,
    pub recorded_at: DateTime<Utc>,
}

impl Trajectory {
    pub fn new(domain: impl Into<String>, pattern_ids: Vec<PatternId>) -> Self {
        Self {
            id: TrajectoryId::new(),
            domain: domain.into(),
            pattern_ids,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_creation() {
        let pattern = Pattern::new("valuation", vec![1.0, 0.0, 0.0], 0.9);

        assert_eq!(pattern.domain, "valuation");
        assert_eq!(pattern.spike_potential, 0.0);
        assert!(pattern.cluster_id.is_none());
        assert!(pattern.last_fired_at.is_none());
        assert!(!pattern.is_active());
    }

    #[test]
    fn test_pattern_active_when_charged() {
        let mut pattern = Pattern::new("valuation", vec![1.0, 0.0], 0.9);
        pattern.spike_potential = 0.4;
        assert!(pattern.is_active());
    }

    #[test]
    fn test_usage_link_construction() {
        let a = PatternId::new();
        let b = PatternId::new();
        let link = UsageLink::new(a, b, "credit", 0.5);

        assert_eq!(link.source_id, a);
        assert_eq!(link.target_id, b);
        assert_eq!(link.weight, 0.5);
    }
}
