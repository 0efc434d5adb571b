//! HTTP handler definitions for the trigger API server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod pipeline;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use pipeline::{get_run_handler, list_runs_handler, trigger_run_handler};

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::orchestrator::Orchestrator;
use crate::traits::{
    ClusterRepository, FeedEntryRepository, JobRepository, RunRepository, VectorRepository,
};

use super::{NetworkConfig, ShutdownController};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap. The
/// repository trait objects let handlers and the orchestrator share one
/// Postgres-backed persistence layer without depending on its concrete type.
#[derive(Clone)]
pub struct AppState {
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Network configuration (bind address, CORS, request timeout).
    pub config: Arc<NetworkConfig>,
    /// Process configuration (tiers, concurrency limits, API key).
    pub app_config: Arc<AppConfig>,
    /// Postgres connection pool, shared with the repository implementations.
    pub db: PgPool,
    pub runs: Arc<dyn RunRepository>,
    pub feed_entries: Arc<dyn FeedEntryRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub vectors: Arc<dyn VectorRepository>,
    pub clusters: Arc<dyn ClusterRepository>,
    /// Drives the fetch/extract/dedupe/cluster/summarize pipeline for a run.
    /// Triggered runs are spawned off the request task against this.
    pub orchestrator: Arc<Orchestrator>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
