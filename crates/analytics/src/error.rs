use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Result series is inconsistent: {0}")]
    InconsistentSeries(String),

    #[error("Invalid analytics parameter '{0}': {1}")]
    InvalidParameter(&'static str, String),
}
