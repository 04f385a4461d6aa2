//! HTTP handlers for the export server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports the handler functions used by the router.

pub mod export;
pub mod health;

pub use export::export_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ShutdownController;
use crate::export::ExportSubmitter;

/// Shared application state passed to all axum handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Health state and in-flight request tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Submission handle of the export worker.
    pub exports: ExportSubmitter,
    /// How long an export request waits for its job before answering
    /// `accepted`.
    pub export_wait: Duration,
    /// Whether every required configuration value was present at startup.
    pub config_complete: bool,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
