// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # SpikingNetworkService — Activation Dynamics over Usage Links
//!
//! Every pattern is a leaky integrate-and-fire neuron. Retrieval fires the
//! pattern's neuron and propagates exactly one hop along its outgoing usage
//! links; repeated calls advance the simulation in well-defined timesteps.
//!
//! ## Concurrency
//!
//! Spike-state updates are optimistic compare-and-swap per neuron with a
//! bounded retry, so concurrent fires on the same neuron never lose an
//! increment. A neuron whose update loses every retry is skipped and logged:
//! a dropped spike is observability noise, not an error.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::analytics::lif::{self, LifParams};
use crate::domain::{AnomalyScore, EngramEvent, NetworkState, PatternId, SpikeEvent};
use crate::infrastructure::PatternStore;

/// Tunables of the spiking side of the engine.
#[derive(Debug, Clone)]
pub struct SpikingConfig {
    pub lif: LifParams,
    /// Direct-stimulus input applied to the invoked neuron
    pub stimulus: f64,
    /// Bounded CAS retries per neuron before the spike is dropped
    pub max_update_attempts: usize,
    /// Trailing window for get_network_state, in seconds
    pub reporter_window_seconds: i64,
    /// How many top firing patterns the reporter returns
    pub top_firing_limit: usize,
}

impl Default for SpikingConfig {
    fn default() -> Self {
        Self {
            lif: LifParams::default(),
            stimulus: 1.0,
            max_update_attempts: 3,
            reporter_window_seconds: 60,
            top_firing_limit: 5,
        }
    }
}

/// SpikingNetworkService interface
#[async_trait]
pub trait SpikingNetworkService: Send + Sync {
    /// Fire a pattern's neuron and propagate one hop along its usage links.
    /// Returns one event for the source plus one per reached neighbor.
    async fn fire_spike(&self, pattern_id: PatternId) -> Result<Vec<SpikeEvent>>;

    /// Aggregate potential/activity statistics for a domain. Never mutates.
    async fn get_network_state(&self, domain: &str) -> Result<NetworkState>;

    /// Zero every potential in a domain. Returns the number of neurons reset.
    async fn reset_network(&self, domain: &str) -> Result<usize>;

    /// Score each pattern's recent fire rate against its historical baseline.
    async fn detect_anomalies(
        &self,
        domain: &str,
        window_seconds: i64,
        z_threshold: f64,
    ) -> Result<Vec<AnomalyScore>>;
}

/// Standard implementation of SpikingNetworkService
pub struct StandardSpikingNetworkService {
    store: Arc<dyn PatternStore>,
    event_bus: Arc<dyn super::EventBus>,
    config: SpikingConfig,
}

impl StandardSpikingNetworkService {
    pub fn new(store: Arc<dyn PatternStore>, event_bus: Arc<dyn super::EventBus>) -> Self {
        Self {
            store,
            event_bus,
            config: SpikingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SpikingConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply one LIF step to a neuron under CAS, re-reading on each lost
    /// race. `force_fire` is the invoked neuron's contract: it fires and
    /// resets no matter where its potential stood.
    async fn stimulate(
        &self,
        pattern_id: PatternId,
        input: f64,
        force_fire: bool,
    ) -> Option<SpikeEvent> {
        for attempt in 0..self.config.max_update_attempts {
            let pattern = match self.store.find_pattern(pattern_id).await {
                Ok(Some(p)) => p,
                Ok(None) => {
                    debug!(?pattern_id, "Stimulated pattern does not exist, skipping");
                    return None;
                }
                Err(e) => {
                    warn!(?pattern_id, error = %e, "Pattern store unavailable, spike not recorded");
                    return None;
                }
            };

            let out = lif::step(pattern.spike_potential, input, &self.config.lif);
            let (new_potential, did_fire) = if force_fire {
                (0.0, true)
            } else {
                (out.potential, out.fired)
            };

            let now = Utc::now();
            let fired_at = did_fire.then_some(now);

            match self
                .store
                .try_update_spike_state(pattern_id, pattern.spike_potential, new_potential, fired_at)
                .await
            {
                Ok(true) => {
                    let event = SpikeEvent {
                        pattern_id,
                        new_potential,
                        did_fire,
                        timestamp: now,
                    };
                    if let Err(e) = self.store.append_spike_event(&pattern.domain, &event).await {
                        warn!(?pattern_id, error = %e, "Failed to append spike event");
                    }
                    return Some(event);
                }
                Ok(false) => {
                    debug!(?pattern_id, attempt, "Lost spike-state race, retrying");
                }
                Err(e) => {
                    warn!(?pattern_id, error = %e, "Spike-state update failed, spike not recorded");
                    return None;
                }
            }
        }

        warn!(
            ?pattern_id,
            attempts = self.config.max_update_attempts,
            "Spike not recorded: conflicting updates exhausted retries"
        );
        None
    }
}

#[async_trait]
impl SpikingNetworkService for StandardSpikingNetworkService {
    async fn fire_spike(&self, pattern_id: PatternId) -> Result<Vec<SpikeEvent>> {
        let source = match self.store.find_pattern(pattern_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                debug!(?pattern_id, "fire_spike on unknown pattern");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(?pattern_id, error = %e, "Pattern store unavailable, spike not recorded");
                return Ok(Vec::new());
            }
        };

        let mut events = Vec::new();

        let Some(source_event) = self.stimulate(pattern_id, self.config.stimulus, true).await
        else {
            return Ok(events);
        };
        events.push(source_event.clone());

        // One hop: each outgoing link carries its weight as input to the
        // downstream neuron. No recursion into neighbors-of-neighbors.
        let links = match self.store.links_from(pattern_id).await {
            Ok(links) => links,
            Err(e) => {
                warn!(?pattern_id, error = %e, "Failed to load usage links, skipping propagation");
                Vec::new()
            }
        };

        for link in &links {
            if link.target_id == pattern_id {
                continue;
            }
            if let Some(event) = self.stimulate(link.target_id, link.weight, false).await {
                events.push(event);
            }
        }

        self.event_bus
            .publish(EngramEvent::SpikeFired {
                pattern_id,
                new_potential: source_event.new_potential,
                did_fire: source_event.did_fire,
                propagated_to: events.len().saturating_sub(1),
                timestamp: source_event.timestamp,
            })
            .await?;

        debug!(
            ?pattern_id,
            domain = %source.domain,
            propagated_to = events.len() - 1,
            "Spike fired"
        );

        Ok(events)
    }

    async fn get_network_state(&self, domain: &str) -> Result<NetworkState> {
        let patterns = match self.store.load_domain_patterns(domain).await {
            Ok(p) => p,
            Err(e) => {
                warn!(domain, error = %e, "Pattern store unavailable, reporting empty network");
                return Ok(NetworkState::empty());
            }
        };

        if patterns.is_empty() {
            return Ok(NetworkState::empty());
        }

        let total_neurons = patterns.len();
        let active_neurons = patterns.iter().filter(|p| p.is_active()).count();
        let avg_potential =
            patterns.iter().map(|p| p.spike_potential).sum::<f64>() / total_neurons as f64;

        let since = Utc::now() - Duration::seconds(self.config.reporter_window_seconds);
        let events = match self.store.load_spike_events_since(domain, since).await {
            Ok(events) => events,
            Err(e) => {
                warn!(domain, error = %e, "Spike log unavailable, reporting without recent activity");
                Vec::new()
            }
        };

        let mut fire_counts: HashMap<PatternId, u64> = HashMap::new();
        let mut recent_spikes = 0;
        for event in events.iter().filter(|e| e.did_fire) {
            recent_spikes += 1;
            *fire_counts.entry(event.pattern_id).or_insert(0) += 1;
        }

        let mut top_firing_patterns: Vec<(PatternId, u64)> = fire_counts.into_iter().collect();
        top_firing_patterns.sort_by(|a, b| b.1.cmp(&a.1).then(a.0 .0.cmp(&b.0 .0)));
        top_firing_patterns.truncate(self.config.top_firing_limit);

        Ok(NetworkState {
            total_neurons,
            active_neurons,
            avg_potential,
            recent_spikes,
            top_firing_patterns,
        })
    }

    async fn reset_network(&self, domain: &str) -> Result<usize> {
        // Write path: surface store failures instead of reporting success.
        let neurons_reset = self.store.reset_potentials(domain).await?;

        info!(domain, neurons_reset, "Network potentials reset");

        self.event_bus
            .publish(EngramEvent::NetworkReset {
                domain: domain.to_string(),
                neurons_reset,
                timestamp: Utc::now(),
            })
            .await?;

        Ok(neurons_reset)
    }

    async fn detect_anomalies(
        &self,
        domain: &str,
        window_seconds: i64,
        z_threshold: f64,
    ) -> Result<Vec<AnomalyScore>> {
        if window_seconds <= 0 {
            warn!(domain, window_seconds, "Non-positive anomaly window, nothing to score");
            return Ok(Vec::new());
        }

        let patterns = match self.store.load_domain_patterns(domain).await {
            Ok(p) => p,
            Err(e) => {
                warn!(domain, error = %e, "Pattern store unavailable, no anomalies reported");
                return Ok(Vec::new());
            }
        };
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let events = match self
            .store
            .load_spike_events_since(domain, DateTime::<Utc>::UNIX_EPOCH)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                warn!(domain, error = %e, "Spike log unavailable, no anomalies reported");
                Vec::new()
            }
        };

        let now = Utc::now();
        let window = Duration::seconds(window_seconds);

        let mut fires_by_pattern: HashMap<PatternId, Vec<DateTime<Utc>>> = HashMap::new();
        for event in events.iter().filter(|e| e.did_fire) {
            fires_by_pattern
                .entry(event.pattern_id)
                .or_default()
                .push(event.timestamp);
        }

        let mut scores = Vec::with_capacity(patterns.len());

        for pattern in &patterns {
            let fires = fires_by_pattern.remove(&pattern.id).unwrap_or_default();
            let score = score_pattern(pattern.id, &fires, now, window, window_seconds, z_threshold);

            if score.is_anomalous {
                self.event_bus
                    .publish(EngramEvent::AnomalyDetected {
                        pattern_id: score.pattern_id,
                        spike_rate: score.spike_rate,
                        avg_rate: score.avg_rate,
                        anomaly_score: score.anomaly_score,
                        timestamp: now,
                    })
                    .await?;
            }
            scores.push(score);
        }

        scores.sort_by(|a, b| {
            b.anomaly_score
                .partial_cmp(&a.anomaly_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(scores)
    }
}

/// Z-score of the current window's fire count against the per-window history.
///
/// History is every completed window of the same width between the pattern's
/// first fire and the start of the current window. σ is floored at 1.0 (one
/// fire per window) so a burst against a silent or perfectly regular history
/// still produces a bounded, comparable score.
fn score_pattern(
    pattern_id: PatternId,
    fires: &[DateTime<Utc>],
    now: DateTime<Utc>,
    window: Duration,
    window_seconds: i64,
    z_threshold: f64,
) -> AnomalyScore {
    let window_start = now - window;
    let spike_rate = fires.iter().filter(|&&t| t >= window_start).count() as f64;

    let first_fire = fires.iter().min().copied();
    let historical_windows = match first_fire {
        Some(first) if first < window_start => {
            ((window_start - first).num_seconds() as f64 / window_seconds as f64).ceil() as usize
        }
        _ => 0,
    };

    if historical_windows == 0 {
        // No completed history to compare against
        return AnomalyScore {
            pattern_id,
            spike_rate,
            avg_rate: 0.0,
            anomaly_score: 0.0,
            is_anomalous: false,
        };
    }

    let mut counts = vec![0f64; historical_windows];
    for &t in fires.iter().filter(|&&t| t < window_start) {
        let age = (window_start - t).num_seconds() as f64 / window_seconds as f64;
        let bucket = (age.floor() as usize).min(historical_windows - 1);
        counts[bucket] += 1.0;
    }

    let avg_rate = counts.iter().sum::<f64>() / historical_windows as f64;
    let variance = counts
        .iter()
        .map(|c| (c - avg_rate).powi(2))
        .sum::<f64>()
        / historical_windows as f64;
    let sigma = variance.sqrt().max(1.0);

    let anomaly_score = (spike_rate - avg_rate) / sigma;

    AnomalyScore {
        pattern_id,
        spike_rate,
        avg_rate,
        anomaly_score,
        is_anomalous: anomaly_score > z_threshold,
    }
}
