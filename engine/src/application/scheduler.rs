// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Partition Scheduler - Background task for cluster maintenance
//!
//! Re-partitions each configured domain on an interval and rebuilds its
//! usage links from the latest trajectories. Clustering is a batch
//! maintenance operation, not a per-request one; this loop is the one place
//! that runs it in production.

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::application::{PartitionConfig, PatternAnalyticsService};

/// Configuration for the partition scheduler
#[derive(Debug, Clone)]
pub struct PartitionSchedulerConfig {
    /// Domains to maintain
    pub domains: Vec<String>,

    /// How often to run a maintenance cycle (in seconds)
    pub interval_seconds: u64,

    /// Thresholds applied to every domain's partitioning run
    pub partition: PartitionConfig,

    /// Whether maintenance is enabled
    pub enabled: bool,
}

impl Default for PartitionSchedulerConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            interval_seconds: 3600, // Run every hour
            partition: PartitionConfig::default(),
            enabled: true,
        }
    }
}

/// Partition Scheduler - Background task
pub struct PartitionScheduler {
    analytics: Arc<dyn PatternAnalyticsService>,
    config: PartitionSchedulerConfig,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl PartitionScheduler {
    pub fn new(
        analytics: Arc<dyn PatternAnalyticsService>,
        config: PartitionSchedulerConfig,
    ) -> Self {
        Self {
            analytics,
            config,
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the scheduler background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the maintenance loop with graceful shutdown support
    async fn run(&self) {
        if !self.config.enabled {
            info!("Partition scheduler is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_seconds,
            domain_count = self.config.domains.len(),
            "Starting partition scheduler background task"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_seconds));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running partition maintenance cycle");

                    match self.maintenance_cycle().await {
                        Ok((clusters, links)) => {
                            info!(
                                clusters,
                                links,
                                "Partition maintenance cycle completed successfully"
                            );
                        }
                        Err(e) => {
                            warn!("Partition maintenance cycle failed: {}", e);
                        }
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping partition scheduler");
                    break;
                }
            }
        }

        info!("Partition scheduler background task stopped");
    }

    /// Execute a single maintenance cycle over every configured domain.
    /// Store failures propagate: a cycle that cannot write must not report
    /// success.
    pub async fn maintenance_cycle(&self) -> Result<(usize, usize)> {
        let mut total_clusters = 0;
        let mut total_links = 0;

        for domain in &self.config.domains {
            let clusters = self
                .analytics
                .partition_patterns(domain, &self.config.partition)
                .await?;
            total_clusters += clusters.len();

            total_links += self.analytics.build_links_from_trajectories(domain).await?;
        }

        Ok((total_clusters, total_links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analytics_service::tests::MockEventBus;
    use crate::application::StandardPatternAnalyticsService;
    use crate::domain::Pattern;
    use crate::infrastructure::{InMemoryPatternStore, PatternStore};

    #[tokio::test]
    async fn test_scheduler_configuration() {
        let config = PartitionSchedulerConfig::default();
        assert_eq!(config.interval_seconds, 3600);
        assert!(config.enabled);
        assert!(config.domains.is_empty());
    }

    #[tokio::test]
    async fn test_maintenance_cycle_partitions_and_links() {
        let store = Arc::new(InMemoryPatternStore::new());
        for embedding in [vec![1.0f32, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]] {
            store
                .save_pattern(&Pattern::new("valuation", embedding, 0.9))
                .await
                .unwrap();
        }

        let analytics = Arc::new(StandardPatternAnalyticsService::new(
            store.clone(),
            Arc::new(MockEventBus::new()),
        ));

        let mut config = PartitionSchedulerConfig::default();
        config.domains = vec!["valuation".to_string()];

        let scheduler = PartitionScheduler::new(analytics, config);
        let (clusters, links) = scheduler.maintenance_cycle().await.unwrap();

        assert!(clusters >= 1);
        assert!(links > 0);

        let stored = store.load_domain_patterns("valuation").await.unwrap();
        assert!(stored.iter().all(|p| p.cluster_id.is_some()));
    }

    #[tokio::test]
    async fn test_scheduler_disabled() {
        let store = Arc::new(InMemoryPatternStore::new());
        let analytics = Arc::new(StandardPatternAnalyticsService::new(
            store,
            Arc::new(MockEventBus::new()),
        ));

        let mut config = PartitionSchedulerConfig::default();
        config.enabled = false;

        let scheduler = Arc::new(PartitionScheduler::new(analytics, config));
        let handle = scheduler.start();

        // A disabled scheduler returns immediately
        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("disabled scheduler should exit")
            .unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_shutdown_token() {
        let store = Arc::new(InMemoryPatternStore::new());
        let analytics = Arc::new(StandardPatternAnalyticsService::new(
            store,
            Arc::new(MockEventBus::new()),
        ));

        let scheduler = Arc::new(PartitionScheduler::new(
            analytics,
            PartitionSchedulerConfig::default(),
        ));
        let token = scheduler.shutdown_token();

        let handle = scheduler.start();
        token.cancel();

        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("scheduler should stop on cancellation")
            .unwrap();
    }
}
