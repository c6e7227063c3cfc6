// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure layer: the repository seam and its backends.

pub mod repository;
pub mod memory_store;
pub mod postgres_store;

pub use repository::{PatternStore, RepositoryError};
pub use memory_store::InMemoryPatternStore;
pub use postgres_store::PostgresPatternStore;
