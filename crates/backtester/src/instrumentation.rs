//! Hooks around each backtest run.

use crate::error::BacktestError;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Identity of one run, passed to every hook.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub strategy: &'static str,
    pub symbol: String,
    pub bars: usize,
}

/// Observes backtest runs without being able to influence them.
///
/// Implementations must be thread-safe: concurrent runs share one instance.
pub trait RunInstrumentation: Send + Sync {
    fn run_started(&self, _run: &RunContext) {}

    fn bar_skipped(&self, _run: &RunContext, _timestamp: DateTime<Utc>) {}

    fn run_finished(
        &self,
        _run: &RunContext,
        _elapsed: Duration,
        _outcome: Result<(), &BacktestError>,
    ) {
    }
}

/// Logs run boundaries and timings through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumentation;

impl RunInstrumentation for TracingInstrumentation {
    fn run_started(&self, run: &RunContext) {
        info!(symbol = %run.symbol, bars = run.bars, "Backtest started");
    }

    fn run_finished(&self, run: &RunContext, elapsed: Duration, outcome: Result<(), &BacktestError>) {
        match outcome {
            Ok(()) => info!(symbol = %run.symbol, ?elapsed, "Backtest finished"),
            Err(e) => warn!(symbol = %run.symbol, ?elapsed, error = %e, "Backtest failed"),
        }
    }
}
