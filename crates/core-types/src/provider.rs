use crate::structs::PriceSeries;
use chrono::{DateTime, Utc};

/// A source of cleaned, time-ordered price series.
///
/// Implementations fetch and cache data (a remote provider, a local file, a
/// database). The backtesting core never calls a provider itself; it receives
/// the fully loaded `PriceSeries` from the caller.
pub trait PriceSeriesProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Loads the bars for `symbol` with timestamps in `[start, end]`.
    fn load(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, Self::Error>;
}
