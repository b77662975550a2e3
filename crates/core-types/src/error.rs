use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Price bars for '{symbol}' are not strictly increasing at {timestamp}")]
    Unordered {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Series '{left}' and '{right}' are not aligned: {reason}")]
    Alignment {
        left: String,
        right: String,
        reason: String,
    },
}
