use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No weight vector satisfies the constraints: {0}")]
    InfeasibleConstraints(String),

    #[error("Covariance matrix is not positive definite: {0}")]
    SingularCovariance(String),

    #[error("Not enough observations: {required} required, {available} available")]
    InsufficientData { required: usize, available: usize },

    #[error("Returns matrix is malformed: {0}")]
    InvalidReturns(String),
}

impl From<configuration::ConfigError> for OptimizerError {
    fn from(error: configuration::ConfigError) -> Self {
        OptimizerError::Config(error.to_string())
    }
}
