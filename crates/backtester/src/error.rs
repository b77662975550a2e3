use chrono::{DateTime, Utc};
use configuration::ConfigError;
use core_types::CoreError;
use strategies::StrategyError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacktestError {
    #[error("Insufficient data: strategy needs {required} bars, series has {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Data gap in '{symbol}' at {at}: {reason}")]
    DataGap {
        symbol: String,
        at: DateTime<Utc>,
        reason: String,
    },

    #[error("Asset and benchmark series are not aligned: {0}")]
    Alignment(CoreError),

    #[error("Invalid price data: {0}")]
    InvalidData(#[from] CoreError),

    #[error("Strategy produced an invalid signal stream: {0}")]
    InvalidSignals(String),

    #[error("Strategy execution error: {0}")]
    Strategy(StrategyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run cancelled after {completed_bars} bars")]
    Cancelled { completed_bars: usize },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl From<StrategyError> for BacktestError {
    fn from(error: StrategyError) -> Self {
        match error {
            StrategyError::Alignment(core) => BacktestError::Alignment(core),
            other => BacktestError::Strategy(other),
        }
    }
}

impl From<ConfigError> for BacktestError {
    fn from(error: ConfigError) -> Self {
        BacktestError::Config(error.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for BacktestError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        BacktestError::ThreadPool(error.to_string())
    }
}

/// Every failed run of a batch, in submission order.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} of the batch's runs failed: {}", .failures.len(), summarize(.failures))]
pub struct BatchError {
    pub failures: Vec<(String, BacktestError)>,
}

fn summarize(failures: &[(String, BacktestError)]) -> String {
    failures
        .iter()
        .map(|(label, error)| format!("[{}] {}", label, error))
        .collect::<Vec<_>>()
        .join("; ")
}
