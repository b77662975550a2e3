use statistics::StatsError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Risk parameters are invalid: {0}")]
    InvalidParameters(String),

    #[error("Confidence level must lie strictly between 0 and 1, got {0}")]
    InvalidConfidenceLevel(f64),

    #[error("Equity curve is unusable: {0}")]
    InvalidEquity(String),

    #[error("Timestamps and values differ in length ({timestamps} vs {values})")]
    LengthMismatch { timestamps: usize, values: usize },

    #[error("A calculation error occurred: {0}")]
    Calculation(#[from] StatsError),
}

impl From<configuration::ConfigError> for RiskError {
    fn from(err: configuration::ConfigError) -> Self {
        RiskError::InvalidParameters(err.to_string())
    }
}
