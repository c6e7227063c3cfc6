// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository interface for the pattern-memory engine.
//!
//! One trait covers the four persisted collections (patterns, usage links,
//! trajectories, spike events) because the engine is their only writer and
//! every operation is keyed by domain. Concrete backends:
//! `InMemoryPatternStore` for development and tests, `PostgresPatternStore`
//! for production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Pattern, PatternId, SpikeEvent, Trajectory, TrajectoryId, UsageLink};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Storage contract for patterns, links, trajectories and the spike log.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Save a pattern (create or update)
    async fn save_pattern(&self, pattern: &Pattern) -> Result<PatternId, RepositoryError>;

    /// Find a pattern by its ID
    async fn find_pattern(&self, id: PatternId) -> Result<Option<Pattern>, RepositoryError>;

    /// Load every pattern in a domain, embeddings included
    async fn load_domain_patterns(&self, domain: &str) -> Result<Vec<Pattern>, RepositoryError>;

    /// Persist a full cluster assignment for a domain in one batch, so
    /// concurrent readers never observe a partially-repartitioned domain
    async fn assign_clusters(
        &self,
        domain: &str,
        assignments: &[(PatternId, i64)],
    ) -> Result<(), RepositoryError>;

    /// Compare-and-swap the spike potential of one pattern.
    ///
    /// Succeeds only when the stored potential still equals
    /// `expected_potential`; returns false on a lost race. When `fired_at`
    /// is set the store also records the fire time and increments
    /// `usage_count` in the same atomic update.
    async fn try_update_spike_state(
        &self,
        id: PatternId,
        expected_potential: f64,
        new_potential: f64,
        fired_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError>;

    /// Zero every potential in a domain. Returns the number of neurons reset.
    async fn reset_potentials(&self, domain: &str) -> Result<usize, RepositoryError>;

    /// Create or update a directed usage link (keyed by source and target)
    async fn upsert_link(&self, link: &UsageLink) -> Result<(), RepositoryError>;

    /// All outgoing links of one pattern
    async fn links_from(&self, source_id: PatternId) -> Result<Vec<UsageLink>, RepositoryError>;

    /// All links in a domain
    async fn load_domain_links(&self, domain: &str) -> Result<Vec<UsageLink>, RepositoryError>;

    /// Record a successful-trajectory co-occurrence (written upstream by the
    /// trace recorder; exposed here for tests and backfills)
    async fn save_trajectory(&self, trajectory: &Trajectory) -> Result<TrajectoryId, RepositoryError>;

    /// All trajectories recorded for a domain
    async fn load_trajectories(&self, domain: &str) -> Result<Vec<Trajectory>, RepositoryError>;

    /// Append to the spike-event log
    async fn append_spike_event(
        &self,
        domain: &str,
        event: &SpikeEvent,
    ) -> Result<(), RepositoryError>;

    /// Spike events for a domain at or after `since`, oldest first
    async fn load_spike_events_since(
        &self,
        domain: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SpikeEvent>, RepositoryError>;
}
