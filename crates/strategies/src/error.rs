use configuration::ConfigError;
use core_types::CoreError;
use statistics::StatsError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Strategy received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("An error occurred during indicator calculation: {0}")]
    IndicatorError(String),

    #[error("Strategy '{0}' requires a benchmark series")]
    MissingBenchmark(String),

    #[error("Asset and benchmark series are not aligned: {0}")]
    Alignment(CoreError),

    #[error("Statistics error: {0}")]
    Statistics(#[from] StatsError),
}

impl From<ConfigError> for StrategyError {
    fn from(err: ConfigError) -> Self {
        StrategyError::InvalidParameters(err.to_string())
    }
}

impl From<ta::errors::TaError> for StrategyError {
    fn from(err: ta::errors::TaError) -> Self {
        StrategyError::IndicatorError(format!("{:?}", err))
    }
}
