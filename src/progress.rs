use backtester::{BacktestError, RunContext, RunInstrumentation, TracingInstrumentation};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Advances a progress bar as batch runs finish, and logs like the default
/// instrumentation.
pub struct ProgressInstrumentation {
    bar: ProgressBar,
    tracing: TracingInstrumentation,
}

impl ProgressInstrumentation {
    pub fn new(runs: usize) -> anyhow::Result<Self> {
        let bar = ProgressBar::new(runs as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self {
            bar,
            tracing: TracingInstrumentation,
        })
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl RunInstrumentation for ProgressInstrumentation {
    fn run_started(&self, run: &RunContext) {
        self.tracing.run_started(run);
    }

    fn bar_skipped(&self, run: &RunContext, timestamp: DateTime<Utc>) {
        self.tracing.bar_skipped(run, timestamp);
    }

    fn run_finished(&self, run: &RunContext, elapsed: Duration, outcome: Result<(), &BacktestError>) {
        self.tracing.run_finished(run, elapsed, outcome);
        self.bar.set_message(format!("{} on {}", run.strategy, run.symbol));
        self.bar.inc(1);
    }
}
