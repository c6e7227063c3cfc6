// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application layer: the engine's call surface and background maintenance.

pub mod analytics_service;
pub mod spiking_service;
pub mod scheduler;

pub use analytics_service::{
    AnalyticsConfig, EventBus, PartitionConfig, PatternAnalyticsService,
    StandardPatternAnalyticsService, TracingEventBus, DEFAULT_NOVELTY_THRESHOLD,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use spiking_service::{SpikingConfig, SpikingNetworkService, StandardSpikingNetworkService};
pub use scheduler::{PartitionScheduler, PartitionSchedulerConfig};
