// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # ENGRAM Analytics CLI
//!
//! Operations tool for the pattern-memory analytics engine: runs the
//! maintenance surface (partitioning, link building, network reset) and the
//! observability surface (edges, mincut, PageRank, novelty, network state,
//! anomalies) against the configured Postgres store.
//!
//! Results are printed as JSON, one document per invocation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use engram_engine::application::{
    PartitionConfig, PatternAnalyticsService, SpikingNetworkService,
    StandardPatternAnalyticsService, StandardSpikingNetworkService, TracingEventBus,
};
use engram_engine::domain::PatternId;
use engram_engine::infrastructure::PostgresPatternStore;

/// ENGRAM pattern-memory analytics
#[derive(Parser)]
#[command(name = "engram")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ENGRAM_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the engine's tables if they do not exist
    Init,

    /// Compute similarity edges for a domain
    Edges {
        #[arg(long)]
        domain: String,
        #[arg(long, default_value_t = 0.3)]
        threshold: f64,
    },

    /// Compute the global minimum cut of a domain's similarity graph
    Mincut {
        #[arg(long)]
        domain: String,
        #[arg(long, default_value_t = 0.3)]
        threshold: f64,
    },

    /// Re-cluster a domain and persist the assignment
    Partition {
        #[arg(long)]
        domain: String,
        #[arg(long, default_value_t = 0.3)]
        similarity_threshold: f64,
        #[arg(long, default_value_t = 0.5)]
        min_cut_threshold: f64,
    },

    /// Score a pattern's novelty against the domain's clusters
    Novelty {
        #[arg(long)]
        pattern_id: Uuid,
        #[arg(long)]
        domain: String,
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,
    },

    /// Rank a domain's patterns by PageRank importance
    Pagerank {
        #[arg(long)]
        domain: String,
    },

    /// Rebuild usage links from recorded trajectories
    BuildLinks {
        #[arg(long)]
        domain: String,
    },

    /// Fire a pattern's neuron and propagate one hop
    Fire {
        #[arg(long)]
        pattern_id: Uuid,
    },

    /// Report a domain's network state
    State {
        #[arg(long)]
        domain: String,
    },

    /// Zero all spike potentials in a domain
    Reset {
        #[arg(long)]
        domain: String,
    },

    /// Score recent fire rates against historical baselines
    Anomalies {
        #[arg(long)]
        domain: String,
        #[arg(long, default_value_t = 3600)]
        window_seconds: i64,
        #[arg(long, default_value_t = 3.0)]
        z_threshold: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let database_url = cli
        .database_url
        .clone()
        .context("DATABASE_URL is required (flag or environment)")?;

    let store = Arc::new(
        PostgresPatternStore::connect(&database_url)
            .await
            .context("Failed to connect to the pattern store")?,
    );

    let bus = Arc::new(TracingEventBus);
    let analytics = StandardPatternAnalyticsService::new(store.clone(), bus.clone());
    let spiking = StandardSpikingNetworkService::new(store.clone(), bus);

    match cli.command {
        Commands::Init => {
            store.initialize().await.context("Schema initialization failed")?;
            info!("Schema initialized");
        }
        Commands::Edges { domain, threshold } => {
            let edges = analytics.build_pattern_edges(&domain, threshold).await?;
            print_json(&edges)?;
        }
        Commands::Mincut { domain, threshold } => {
            let result = analytics.compute_mincut(&domain, threshold).await?;
            print_json(&result)?;
        }
        Commands::Partition {
            domain,
            similarity_threshold,
            min_cut_threshold,
        } => {
            let clusters = analytics
                .partition_patterns(
                    &domain,
                    &PartitionConfig {
                        similarity_threshold,
                        min_cut_threshold,
                    },
                )
                .await?;
            print_json(&clusters)?;
        }
        Commands::Novelty {
            pattern_id,
            domain,
            threshold,
        } => {
            let score = analytics
                .detect_novel_pattern(PatternId(pattern_id), &domain, threshold)
                .await?;
            print_json(&score)?;
        }
        Commands::Pagerank { domain } => {
            let entries = analytics.compute_pattern_pagerank(&domain).await?;
            print_json(&entries)?;
        }
        Commands::BuildLinks { domain } => {
            let count = analytics.build_links_from_trajectories(&domain).await?;
            print_json(&serde_json::json!({ "links_written": count }))?;
        }
        Commands::Fire { pattern_id } => {
            let events = spiking.fire_spike(PatternId(pattern_id)).await?;
            print_json(&events)?;
        }
        Commands::State { domain } => {
            let state = spiking.get_network_state(&domain).await?;
            print_json(&state)?;
        }
        Commands::Reset { domain } => {
            let count = spiking.reset_network(&domain).await?;
            print_json(&serde_json::json!({ "neurons_reset": count }))?;
        }
        Commands::Anomalies {
            domain,
            window_seconds,
            z_threshold,
        } => {
            let scores = spiking
                .detect_anomalies(&domain, window_seconds, z_threshold)
                .await?;
            print_json(&scores)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
