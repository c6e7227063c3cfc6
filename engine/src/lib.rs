// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # ENGRAM — Pattern-Memory Analytics Engine
//!
//! Analytics over the agent's reasoning bank: clustering of tool-use
//! patterns by embedding similarity (global mincut), novelty scoring,
//! PageRank importance, and a leaky integrate-and-fire spiking network over
//! usage links for reuse-burst detection.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **domain:** entities and value objects
//! - **analytics:** pure in-process algorithms (no I/O)
//! - **application:** services and background maintenance
//! - **infrastructure:** repository seam and storage backends

pub mod domain;
pub mod analytics;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::*;
pub use infrastructure::*;
