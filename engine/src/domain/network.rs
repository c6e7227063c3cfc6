// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Spiking-network records: the append-only spike-event log and the
//! aggregate views the reporter and anomaly detector build over it.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use super::pattern::PatternId;

/// One application of the LIF step to a neuron, appended to the event log.
///
/// `did_fire` marks threshold crossings; the fired neuron's potential is
/// always reset to exactly 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeEvent {
    pub pattern_id: PatternId,
    pub new_potential: f64,
    pub did_fire: bool,
    pub timestamp: DateTime<Utc>,
}

impl SpikeEvent {
    pub fn new(pattern_id: PatternId, new_potential: f64, did_fire: bool) -> Self {
        Self {
            pattern_id,
            new_potential,
            did_fire,
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate snapshot of a domain's spiking network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkState {
    pub total_neurons: usize,
    /// Neurons with potential > 0.
    pub active_neurons: usize,
    pub avg_potential: f64,
    /// Fire events within the reporter's trailing window.
    pub recent_spikes: usize,
    /// Patterns with the most fire events in the window, with their counts.
    pub top_firing_patterns: Vec<(PatternId, u64)>,
}

impl NetworkState {
    pub fn empty() -> Self {
        Self {
            total_neurons: 0,
            active_neurons: 0,
            avg_potential: 0.0,
            recent_spikes: 0,
            top_firing_patterns: Vec::new(),
        }
    }
}

/// Deviation of a pattern's recent fire rate from its historical baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub pattern_id: PatternId,
    /// Fire-event count within the trailing window.
    pub spike_rate: f64,
    /// Mean fire count over completed historical windows of the same width.
    pub avg_rate: f64,
    /// Z-score of `spike_rate` against the historical window distribution.
    pub anomaly_score: f64,
    pub is_anomalous: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_event_construction() {
        let id = PatternId::new();
        let event = SpikeEvent::new(id, 0.0, true);

        assert_eq!(event.pattern_id, id);
        assert!(event.did_fire);
        assert_eq!(event.new_potential, 0.0);
    }

    #[test]
    fn test_empty_network_state() {
        let state = NetworkState::empty();
        assert_eq!(state.total_neurons, 0);
        assert_eq!(state.active_neurons, 0);
        assert_eq!(state.avg_potential, 0.0);
        assert!(state.top_firing_patterns.is_empty());
    }
}
