// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # PostgreSQL Pattern Store
//!
//! Production `PatternStore` implementation over four tables via `sqlx`:
//! `patterns`, `usage_links`, `trajectories`, and the append-only
//! `spike_events` log. Embeddings are stored as `REAL[]`; the engine does
//! exact in-process comparison, so no vector index is required.
//!
//! Spike-state updates are optimistic: the UPDATE is guarded on the
//! previously-read potential, and a zero row count reports the lost race to
//! the caller instead of overwriting a concurrent increment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::{Pattern, PatternId, SpikeEvent, Trajectory, TrajectoryId, UsageLink};
use crate::infrastructure::repository::{PatternStore, RepositoryError};

pub struct PostgresPatternStore {
    pool: PgPool,
}

impl PostgresPatternStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and return a store over a fresh pool.
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Create the engine's tables if they do not exist.
    pub async fn initialize(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patterns (
                id UUID PRIMARY KEY,
                domain TEXT NOT NULL,
                embedding REAL[] NOT NULL,
                cluster_id BIGINT,
                spike_potential DOUBLE PRECISION NOT NULL DEFAULT 0,
                last_fired_at TIMESTAMPTZ,
                usage_count BIGINT NOT NULL DEFAULT 0,
                confidence DOUBLE PRECISION NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_patterns_domain ON patterns(domain)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_links (
                source_id UUID NOT NULL,
                target_id UUID NOT NULL,
                domain TEXT NOT NULL,
                weight DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (source_id, target_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trajectories (
                id UUID PRIMARY KEY,
                domain TEXT NOT NULL,
                pattern_ids UUID[] NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spike_events (
                id BIGSERIAL PRIMARY KEY,
                domain TEXT NOT NULL,
                pattern_id UUID NOT NULL,
                new_potential DOUBLE PRECISION NOT NULL,
                did_fire BOOLEAN NOT NULL,
                fired_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_spike_events_domain_time ON spike_events(domain, fired_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_pattern(row: &sqlx::postgres::PgRow) -> Pattern {
        let usage_count: i64 = row.get("usage_count");
        Pattern {
            id: PatternId(row.get::<Uuid, _>("id")),
            domain: row.get("domain"),
            embedding: row.get::<Vec<f32>, _>("embedding"),
            cluster_id: row.get::<Option<i64>, _>("cluster_id"),
            spike_potential: row.get("spike_potential"),
            last_fired_at: row.get::<Option<DateTime<Utc>>, _>("last_fired_at"),
            usage_count: usage_count.max(0) as u64,
            confidence: row.get("confidence"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl PatternStore for PostgresPatternStore {
    async fn save_pattern(&self, pattern: &Pattern) -> Result<PatternId, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO patterns (
                id, domain, embedding, cluster_id, spike_potential,
                last_fired_at, usage_count, confidence, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                domain = EXCLUDED.domain,
                embedding = EXCLUDED.embedding,
                cluster_id = EXCLUDED.cluster_id,
                spike_potential = EXCLUDED.spike_potential,
                last_fired_at = EXCLUDED.last_fired_at,
                usage_count = EXCLUDED.usage_count,
                confidence = EXCLUDED.confidence
            "#,
        )
        .bind(pattern.id.0)
        .bind(&pattern.domain)
        .bind(&pattern.embedding)
        .bind(pattern.cluster_id)
        .bind(pattern.spike_potential)
        .bind(pattern.last_fired_at)
        .bind(pattern.usage_count as i64)
        .bind(pattern.confidence)
        .bind(pattern.created_at)
        .execute(&self.pool)
        .await?;

        Ok(pattern.id)
    }

    async fn find_pattern(&self, id: PatternId) -> Result<Option<Pattern>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM patterns WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::row_to_pattern))
    }

    async fn load_domain_patterns(&self, domain: &str) -> Result<Vec<Pattern>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM patterns WHERE domain = $1 ORDER BY id")
            .bind(domain)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::row_to_pattern).collect())
    }

    async fn assign_clusters(
        &self,
        domain: &str,
        assignments: &[(PatternId, i64)],
    ) -> Result<(), RepositoryError> {
        // One transaction per batch: readers see the old assignment or the
        // new one, never a mixture.
        let mut tx = self.pool.begin().await?;

        for (id, cluster_id) in assignments {
            sqlx::query("UPDATE patterns SET cluster_id = $2 WHERE id = $1 AND domain = $3")
                .bind(id.0)
                .bind(cluster_id)
                .bind(domain)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn try_update_spike_state(
        &self,
        id: PatternId,
        expected_potential: f64,
        new_potential: f64,
        fired_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE patterns
            SET spike_potential = $3,
                last_fired_at = COALESCE($4, last_fired_at),
                usage_count = usage_count + CASE WHEN $4 IS NULL THEN 0 ELSE 1 END
            WHERE id = $1 AND spike_potential = $2
            "#,
        )
        .bind(id.0)
        .bind(expected_potential)
        .bind(new_potential)
        .bind(fired_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reset_potentials(&self, domain: &str) -> Result<usize, RepositoryError> {
        let result = sqlx::query("UPDATE patterns SET spike_potential = 0 WHERE domain = $1")
            .bind(domain)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }

    async fn upsert_link(&self, link: &UsageLink) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO usage_links (source_id, target_id, domain, weight)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source_id, target_id) DO UPDATE SET
                domain = EXCLUDED.domain,
                weight = EXCLUDED.weight
            "#,
        )
        .bind(link.source_id.0)
        .bind(link.target_id.0)
        .bind(&link.domain)
        .bind(link.weight)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn links_from(&self, source_id: PatternId) -> Result<Vec<UsageLink>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM usage_links WHERE source_id = $1")
            .bind(source_id.0)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| UsageLink {
                source_id: PatternId(row.get::<Uuid, _>("source_id")),
                target_id: PatternId(row.get::<Uuid, _>("target_id")),
                domain: row.get("domain"),
                weight: row.get("weight"),
            })
            .collect())
    }

    async fn load_domain_links(&self, domain: &str) -> Result<Vec<UsageLink>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM usage_links WHERE domain = $1")
            .bind(domain)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| UsageLink {
                source_id: PatternId(row.get::<Uuid, _>("source_id")),
                target_id: PatternId(row.get::<Uuid, _>("target_id")),
                domain: row.get("domain"),
                weight: row.get("weight"),
            })
            .collect())
    }

    async fn save_trajectory(&self, trajectory: &Trajectory) -> Result<TrajectoryId, RepositoryError> {
        let pattern_ids: Vec<Uuid> = trajectory.pattern_ids.iter().map(|p| p.0).collect();

        sqlx::query(
            r#"
            INSERT INTO trajectories (id, domain, pattern_ids, recorded_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(trajectory.id.0)
        .bind(&trajectory.domain)
        .bind(&pattern_ids)
        .bind(trajectory.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(trajectory.id)
    }

    async fn load_trajectories(&self, domain: &str) -> Result<Vec<Trajectory>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM trajectories WHERE domain = $1 ORDER BY recorded_at")
            .bind(domain)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Trajectory {
                id: TrajectoryId(row.get::<Uuid, _>("id")),
                domain: row.get("domain"),
                pattern_ids: row
                    .get::<Vec<Uuid>, _>("pattern_ids")
                    .into_iter()
                    .map(PatternId)
                    .collect(),
                recorded_at: row.get("recorded_at"),
            })
            .collect())
    }

    async fn append_spike_event(
        &self,
        domain: &str,
        event: &SpikeEvent,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO spike_events (domain, pattern_id, new_potential, did_fire, fired_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(domain)
        .bind(event.pattern_id.0)
        .bind(event.new_potential)
        .bind(event.did_fire)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_spike_events_since(
        &self,
        domain: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SpikeEvent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT pattern_id, new_potential, did_fire, fired_at
            FROM spike_events
            WHERE domain = $1 AND fired_at >= $2
            ORDER BY fired_at
            "#,
        )
        .bind(domain)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SpikeEvent {
                pattern_id: PatternId(row.get::<Uuid, _>("pattern_id")),
                new_potential: row.get("new_potential"),
                did_fire: row.get("did_fire"),
                timestamp: row.get("fired_at"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> PostgresPatternStore {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/engram_test".to_string());
        let store = PostgresPatternStore::connect(&url)
            .await
            .expect("Failed to connect to Postgres");
        store.initialize().await.expect("Failed to initialize schema");
        store
    }

    #[tokio::test]
    #[ignore] // Requires running Postgres instance
    async fn test_store_and_retrieve_pattern() {
        let store = test_store().await;

        let pattern = Pattern::new("pg_test", vec![0.1, 0.2, 0.3], 0.8);
        let id = store.save_pattern(&pattern).await.expect("Failed to save");

        let found = store.find_pattern(id).await.expect("Failed to find");
        assert!(found.is_some());
        let found = found.unwrap();
        assert_eq!(found.domain, "pg_test");
        assert_eq!(found.embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    #[ignore] // Requires running Postgres instance
    async fn test_cas_guard() {
        let store = test_store().await;

        let pattern = Pattern::new("pg_test", vec![1.0], 0.8);
        store.save_pattern(&pattern).await.expect("Failed to save");

        let first = store
            .try_update_spike_state(pattern.id, 0.0, 0.5, None)
            .await
            .expect("CAS failed");
        assert!(first);

        let stale = store
            .try_update_spike_state(pattern.id, 0.0, 0.9, None)
            .await
            .expect("CAS failed");
        assert!(!stale);
    }

    #[tokio::test]
    #[ignore] // Requires running Postgres instance
    async fn test_link_upsert_idempotent() {
        let store = test_store().await;

        let a = PatternId::new();
        let b = PatternId::new();
        store.upsert_link(&UsageLink::new(a, b, "pg_test", 0.3)).await.unwrap();
        store.upsert_link(&UsageLink::new(a, b, "pg_test", 0.7)).await.unwrap();

        let links = store.links_from(a).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].weight, 0.7);
    }
}
