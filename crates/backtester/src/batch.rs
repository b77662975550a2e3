//! Concurrent execution of independent backtest runs.

use crate::engine::Backtester;
use crate::error::{BacktestError, BatchError};
use core_types::{MarketData, ResultSeries};
use rayon::prelude::*;
use strategies::Strategy;
use tracing::info;

/// One unit of work for the batch runner.
pub struct BacktestJob<'a> {
    pub label: String,
    pub strategy: &'a dyn Strategy,
    pub data: MarketData<'a>,
}

impl<'a> BacktestJob<'a> {
    pub fn new(strategy: &'a dyn Strategy, data: MarketData<'a>) -> Self {
        Self {
            label: format!("{}:{}", strategy.name(), data.prices.symbol()),
            strategy,
            data,
        }
    }
}

/// Outcome of one run in a batch.
#[derive(Debug)]
pub struct RunOutcome {
    pub label: String,
    pub result: Result<ResultSeries, BacktestError>,
}

/// Outcomes of every run, in submission order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub runs: Vec<RunOutcome>,
}

impl BatchOutcome {
    pub fn successes(&self) -> impl Iterator<Item = &ResultSeries> {
        self.runs.iter().filter_map(|r| r.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &BacktestError)> {
        self.runs
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.label.as_str(), e)))
    }

    pub fn is_complete_success(&self) -> bool {
        self.runs.iter().all(|r| r.result.is_ok())
    }

    /// All results, or every failure together.
    pub fn into_results(self) -> Result<Vec<ResultSeries>, BatchError> {
        let mut results = Vec::with_capacity(self.runs.len());
        let mut failures = Vec::new();
        for run in self.runs {
            match run.result {
                Ok(result) => results.push(result),
                Err(error) => failures.push((run.label, error)),
            }
        }
        if failures.is_empty() {
            Ok(results)
        } else {
            Err(BatchError { failures })
        }
    }
}

impl Backtester {
    /// Runs every job on a dedicated worker pool and waits for all of them.
    ///
    /// A failing run never affects its siblings; each run's outcome is
    /// reported separately.
    pub fn run_jobs(&self, jobs: &[BacktestJob<'_>]) -> Result<BatchOutcome, BacktestError> {
        let workers = match self.settings().workers {
            0 => num_cpus::get(),
            n => n,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.min(jobs.len().max(1)))
            .thread_name(|i| format!("backtest-worker-{}", i))
            .build()?;

        info!(jobs = jobs.len(), workers, "Starting backtest batch");
        let runs: Vec<RunOutcome> = pool.install(|| {
            jobs.par_iter()
                .map(|job| RunOutcome {
                    label: job.label.clone(),
                    result: self.run(job.strategy, &job.data),
                })
                .collect()
        });

        let outcome = BatchOutcome { runs };
        info!(
            succeeded = outcome.successes().count(),
            failed = outcome.failures().count(),
            "Backtest batch complete"
        );
        Ok(outcome)
    }

    /// Runs several strategies over the same market data concurrently.
    pub fn run_all(
        &self,
        strategies: &[Box<dyn Strategy>],
        data: &MarketData<'_>,
    ) -> Result<BatchOutcome, BacktestError> {
        let jobs: Vec<BacktestJob<'_>> = strategies
            .iter()
            .map(|s| BacktestJob::new(s.as_ref(), *data))
            .collect();
        self.run_jobs(&jobs)
    }
}
