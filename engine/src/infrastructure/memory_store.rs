// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory implementation of PatternStore for development and testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{Pattern, PatternId, SpikeEvent, Trajectory, TrajectoryId, UsageLink};
use crate::infrastructure::repository::{PatternStore, RepositoryError};

/// In-memory store keeping all four collections under tokio RwLocks.
///
/// The pattern map's single write lock gives the same per-row atomicity the
/// Postgres backend gets from its guarded UPDATE.
pub struct InMemoryPatternStore {
    patterns: Arc<RwLock<HashMap<PatternId, Pattern>>>,
    links: Arc<RwLock<HashMap<(PatternId, PatternId), UsageLink>>>,
    trajectories: Arc<RwLock<Vec<Trajectory>>>,
    spike_events: Arc<RwLock<Vec<(String, SpikeEvent)>>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self {
            patterns: Arc::new(RwLock::new(HashMap::new())),
            links: Arc::new(RwLock::new(HashMap::new())),
            trajectories: Arc::new(RwLock::new(Vec::new())),
            spike_events: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryPatternStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn save_pattern(&self, pattern: &Pattern) -> Result<PatternId, RepositoryError> {
        let mut patterns = self.patterns.write().await;
        patterns.insert(pattern.id, pattern.clone());
        Ok(pattern.id)
    }

    async fn find_pattern(&self, id: PatternId) -> Result<Option<Pattern>, RepositoryError> {
        let patterns = self.patterns.read().await;
        Ok(patterns.get(&id).cloned())
    }

    async fn load_domain_patterns(&self, domain: &str) -> Result<Vec<Pattern>, RepositoryError> {
        let patterns = self.patterns.read().await;
        let mut result: Vec<Pattern> = patterns
            .values()
            .filter(|p| p.domain == domain)
            .cloned()
            .collect();
        // Deterministic order for callers that index into the result
        result.sort_by_key(|p| p.id.0);
        Ok(result)
    }

    async fn assign_clusters(
        &self,
        domain: &str,
        assignments: &[(PatternId, i64)],
    ) -> Result<(), RepositoryError> {
        let mut patterns = self.patterns.write().await;

        // Validate the whole batch before touching anything: readers under
        // the same lock never see a half-applied assignment.
        for (id, _) in assignments {
            let pattern = patterns.get(id).ok_or_else(|| {
                RepositoryError::NotFound(format!("Pattern not found: {:?}", id))
            })?;
            if pattern.domain != domain {
                return Err(RepositoryError::Unknown(format!(
                    "Pattern {:?} does not belong to domain {}",
                    id, domain
                )));
            }
        }

        for (id, cluster_id) in assignments {
            if let Some(pattern) = patterns.get_mut(id) {
                pattern.cluster_id = Some(*cluster_id);
            }
        }

        Ok(())
    }

    async fn try_update_spike_state(
        &self,
        id: PatternId,
        expected_potential: f64,
        new_potential: f64,
        fired_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError> {
        let mut patterns = self.patterns.write().await;

        let pattern = patterns
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Pattern not found: {:?}", id)))?;

        if pattern.spike_potential != expected_potential {
            return Ok(false);
        }

        pattern.spike_potential = new_potential;
        if let Some(ts) = fired_at {
            pattern.last_fired_at = Some(ts);
            pattern.usage_count += 1;
        }

        Ok(true)
    }

    async fn reset_potentials(&self, domain: &str) -> Result<usize, RepositoryError> {
        let mut patterns = self.patterns.write().await;

        let mut count = 0;
        for pattern in patterns.values_mut().filter(|p| p.domain == domain) {
            pattern.spike_potential = 0.0;
            count += 1;
        }

        Ok(count)
    }

    async fn upsert_link(&self, link: &UsageLink) -> Result<(), RepositoryError> {
        let mut links = self.links.write().await;
        links.insert((link.source_id, link.target_id), link.clone());
        Ok(())
    }

    async fn links_from(&self, source_id: PatternId) -> Result<Vec<UsageLink>, RepositoryError> {
        let links = self.links.read().await;
        Ok(links
            .values()
            .filter(|link| link.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn load_domain_links(&self, domain: &str) -> Result<Vec<UsageLink>, RepositoryError> {
        let links = self.links.read().await;
        Ok(links
            .values()
            .filter(|link| link.domain == domain)
            .cloned()
            .collect())
    }

    async fn save_trajectory(&self, trajectory: &Trajectory) -> Result<TrajectoryId, RepositoryError> {
        let mut trajectories = self.trajectories.write().await;
        trajectories.push(trajectory.clone());
        Ok(trajectory.id)
    }

    async fn load_trajectories(&self, domain: &str) -> Result<Vec<Trajectory>, RepositoryError> {
        let trajectories = self.trajectories.read().await;
        Ok(trajectories
            .iter()
            .filter(|t| t.domain == domain)
            .cloned()
            .collect())
    }

    async fn append_spike_event(
        &self,
        domain: &str,
        event: &SpikeEvent,
    ) -> Result<(), RepositoryError> {
        let mut events = self.spike_events.write().await;
        events.push((domain.to_string(), event.clone()));
        Ok(())
    }

    async fn load_spike_events_since(
        &self,
        domain: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SpikeEvent>, RepositoryError> {
        let events = self.spike_events.read().await;
        Ok(events
            .iter()
            .filter(|(d, e)| d == domain && e.timestamp >= since)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_find_pattern() {
        let store = InMemoryPatternStore::new();
        let pattern = Pattern::new("valuation", vec![1.0, 0.0], 0.9);

        let id = store.save_pattern(&pattern).await.unwrap();

        let found = store.find_pattern(id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().id, pattern.id);
    }

    #[tokio::test]
    async fn test_domain_filter() {
        let store = InMemoryPatternStore::new();
        store.save_pattern(&Pattern::new("valuation", vec![1.0], 0.9)).await.unwrap();
        store.save_pattern(&Pattern::new("valuation", vec![0.5], 0.9)).await.unwrap();
        store.save_pattern(&Pattern::new("credit", vec![0.1], 0.9)).await.unwrap();

        assert_eq!(store.load_domain_patterns("valuation").await.unwrap().len(), 2);
        assert_eq!(store.load_domain_patterns("credit").await.unwrap().len(), 1);
        assert!(store.load_domain_patterns("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_clusters_batch() {
        let store = InMemoryPatternStore::new();
        let a = Pattern::new("valuation", vec![1.0], 0.9);
        let b = Pattern::new("valuation", vec![0.9], 0.9);
        store.save_pattern(&a).await.unwrap();
        store.save_pattern(&b).await.unwrap();

        store
            .assign_clusters("valuation", &[(a.id, 0), (b.id, 1)])
            .await
            .unwrap();

        assert_eq!(store.find_pattern(a.id).await.unwrap().unwrap().cluster_id, Some(0));
        assert_eq!(store.find_pattern(b.id).await.unwrap().unwrap().cluster_id, Some(1));
    }

    #[tokio::test]
    async fn test_cas_succeeds_on_expected_potential() {
        let store = InMemoryPatternStore::new();
        let pattern = Pattern::new("valuation", vec![1.0], 0.9);
        store.save_pattern(&pattern).await.unwrap();

        let updated = store
            .try_update_spike_state(pattern.id, 0.0, 0.5, None)
            .await
            .unwrap();
        assert!(updated);

        let stored = store.find_pattern(pattern.id).await.unwrap().unwrap();
        assert_eq!(stored.spike_potential, 0.5);
        assert_eq!(stored.usage_count, 0);
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_expectation() {
        let store = InMemoryPatternStore::new();
        let pattern = Pattern::new("valuation", vec![1.0], 0.9);
        store.save_pattern(&pattern).await.unwrap();

        store.try_update_spike_state(pattern.id, 0.0, 0.5, None).await.unwrap();

        // Second writer still believes the potential is 0.0
        let updated = store
            .try_update_spike_state(pattern.id, 0.0, 0.7, None)
            .await
            .unwrap();
        assert!(!updated);

        let stored = store.find_pattern(pattern.id).await.unwrap().unwrap();
        assert_eq!(stored.spike_potential, 0.5);
    }

    #[tokio::test]
    async fn test_cas_fire_records_usage() {
        let store = InMemoryPatternStore::new();
        let pattern = Pattern::new("valuation", vec![1.0], 0.9);
        store.save_pattern(&pattern).await.unwrap();

        let now = Utc::now();
        store
            .try_update_spike_state(pattern.id, 0.0, 0.0, Some(now))
            .await
            .unwrap();

        let stored = store.find_pattern(pattern.id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);
        assert_eq!(stored.last_fired_at, Some(now));
    }

    #[tokio::test]
    async fn test_reset_potentials() {
        let store = InMemoryPatternStore::new();
        let mut a = Pattern::new("valuation", vec![1.0], 0.9);
        a.spike_potential = 0.8;
        let mut b = Pattern::new("credit", vec![1.0], 0.9);
        b.spike_potential = 0.4;
        store.save_pattern(&a).await.unwrap();
        store.save_pattern(&b).await.unwrap();

        let count = store.reset_potentials("valuation").await.unwrap();
        assert_eq!(count, 1);

        assert_eq!(store.find_pattern(a.id).await.unwrap().unwrap().spike_potential, 0.0);
        // Other domain untouched
        assert_eq!(store.find_pattern(b.id).await.unwrap().unwrap().spike_potential, 0.4);
    }

    #[tokio::test]
    async fn test_upsert_link_is_idempotent() {
        let store = InMemoryPatternStore::new();
        let a = PatternId::new();
        let b = PatternId::new();

        store.upsert_link(&UsageLink::new(a, b, "valuation", 0.3)).await.unwrap();
        store.upsert_link(&UsageLink::new(a, b, "valuation", 0.6)).await.unwrap();

        let links = store.links_from(a).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].weight, 0.6);
    }

    #[tokio::test]
    async fn test_spike_event_window() {
        let store = InMemoryPatternStore::new();
        let id = PatternId::new();

        let mut old = SpikeEvent::new(id, 0.0, true);
        old.timestamp = Utc::now() - chrono::Duration::seconds(3600);
        store.append_spike_event("valuation", &old).await.unwrap();
        store.append_spike_event("valuation", &SpikeEvent::new(id, 0.0, true)).await.unwrap();

        let recent = store
            .load_spike_events_since("valuation", Utc::now() - chrono::Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let all = store
            .load_spike_events_since("valuation", Utc::now() - chrono::Duration::seconds(7200))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
