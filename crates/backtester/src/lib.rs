//! # Quantlab Backtester
//!
//! Bar-by-bar simulation of a strategy's signal stream against a price series.
//!
//! A signal computed from bars up to and including bar *t* is executed at bar
//! *t+1*'s open, so no decision ever trades on the bar that produced it. Each
//! bar is processed atomically in this order:
//!
//! 1. cancellation checkpoint,
//! 2. time-based exit at the open,
//! 3. the previous bar's signal at the open,
//! 4. intra-bar stop-loss / take-profit,
//! 5. mark-to-market at the close.
//!
//! Independent runs share the immutable price series and execute on a `rayon`
//! worker pool; see [`Backtester::run_jobs`].

pub mod batch;
pub mod cancellation;
pub mod engine;
pub mod error;
pub mod instrumentation;
mod portfolio;

pub use batch::{BacktestJob, BatchOutcome, RunOutcome};
pub use cancellation::CancellationToken;
pub use engine::Backtester;
pub use error::{BacktestError, BatchError};
pub use instrumentation::{RunContext, RunInstrumentation, TracingInstrumentation};

use configuration::{Config, StrategyConfig};
use core_types::{MarketData, ResultSeries};
use strategies::{Strategy, strategy_from_config};

/// Builds the configured strategy and backtests it over `data`.
pub fn run_backtest(
    data: &MarketData<'_>,
    strategy: &StrategyConfig,
    config: &Config,
) -> Result<ResultSeries, BacktestError> {
    let strategy = strategy_from_config(strategy, &config.strategies)?;
    Backtester::new(config.backtest.clone())?.run(strategy.as_ref(), data)
}

/// Backtests several strategy configurations over the same data concurrently.
///
/// A configuration that fails to build is reported as a failed run alongside
/// the others rather than aborting the batch.
pub fn run_backtests(
    data: &MarketData<'_>,
    strategies: &[StrategyConfig],
    config: &Config,
) -> Result<BatchOutcome, BacktestError> {
    let backtester = Backtester::new(config.backtest.clone())?;

    let built: Vec<Result<Box<dyn Strategy>, BacktestError>> = strategies
        .iter()
        .map(|s| strategy_from_config(s, &config.strategies).map_err(BacktestError::from))
        .collect();

    let completed = {
        let jobs: Vec<BacktestJob<'_>> = built
            .iter()
            .filter_map(|s| s.as_ref().ok())
            .map(|s| BacktestJob::new(s.as_ref(), *data))
            .collect();
        backtester.run_jobs(&jobs)?
    };
    let mut completed = completed.runs.into_iter();

    // Re-interleave construction failures so outcomes keep submission order.
    let runs = strategies
        .iter()
        .zip(built)
        .map(|(config, built)| match built {
            Ok(_) => completed.next().unwrap_or_else(|| RunOutcome {
                label: config.id.to_string(),
                result: Err(BacktestError::InvalidSignals("run produced no outcome".to_string())),
            }),
            Err(error) => RunOutcome {
                label: config.id.to_string(),
                result: Err(error),
            },
        })
        .collect();

    Ok(BatchOutcome { runs })
}
