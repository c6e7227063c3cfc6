// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the pattern-memory analytics engine.
//! Published to the EventBus for observability and integration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::pattern::PatternId;

/// Engram domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngramEvent {
    /// A domain was re-partitioned into clusters
    PatternsPartitioned {
        domain: String,
        cluster_count: usize,
        cut_value: f64,
        timestamp: DateTime<Utc>,
    },

    /// Usage links were rebuilt for a domain
    LinksRebuilt {
        domain: String,
        link_count: usize,
        /// False when the similarity fallback was used instead of trajectories
        from_trajectories: bool,
        timestamp: DateTime<Utc>,
    },

    /// A neuron received a direct stimulus and fired
    SpikeFired {
        pattern_id: PatternId,
        new_potential: f64,
        did_fire: bool,
        /// Downstream neurons reached by one-hop propagation
        propagated_to: usize,
        timestamp: DateTime<Utc>,
    },

    /// All potentials in a domain were zeroed
    NetworkReset {
        domain: String,
        neurons_reset: usize,
        timestamp: DateTime<Utc>,
    },

    /// A pattern's recent fire rate deviated past the z-threshold
    AnomalyDetected {
        pattern_id: PatternId,
        spike_rate: f64,
        avg_rate: f64,
        anomaly_score: f64,
        timestamp: DateTime<Utc>,
    },
}

impl EngramEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EngramEvent::PatternsPartitioned { timestamp, .. } => *timestamp,
            EngramEvent::LinksRebuilt { timestamp, .. } => *timestamp,
            EngramEvent::SpikeFired { timestamp, .. } => *timestamp,
            EngramEvent::NetworkReset { timestamp, .. } => *timestamp,
            EngramEvent::AnomalyDetected { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            EngramEvent::PatternsPartitioned { .. } => "patterns_partitioned",
            EngramEvent::LinksRebuilt { .. } => "links_rebuilt",
            EngramEvent::SpikeFired { .. } => "spike_fired",
            EngramEvent::NetworkReset { .. } => "network_reset",
            EngramEvent::AnomalyDetected { .. } => "anomaly_detected",
        }
    }
}
