use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Not enough observations: {required} required, {available} available")]
    InsufficientData { required: usize, available: usize },

    #[error("Input series have different lengths ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("Regression design matrix is singular: {0}")]
    Singular(String),

    #[error("Input contains non-finite values")]
    NonFinite,
}
