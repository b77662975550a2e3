//! # Quantlab Statistics
//!
//! Pure numeric routines shared by the strategies, risk engine and optimizer.
//!
//! Every function takes plain slices and returns a fresh value. Nothing here
//! keeps state between calls, which lets rolling estimators be recomputed over
//! a sliding window without any hidden state leaking across runs.

pub mod descriptive;
pub mod error;
pub mod half_life;
pub mod ratios;
pub mod regression;
pub mod rolling;
pub mod stationarity;
pub mod window;

pub use descriptive::{mean, quantile, sample_std, sample_variance};
pub use error::StatsError;
pub use half_life::{HalfLife, estimate_half_life};
pub use ratios::{sharpe_ratio, sortino_ratio};
pub use regression::{LinearFit, MultipleFit, hedge_ratio, ols, ols_multiple};
pub use rolling::{rolling_mean, rolling_std, rolling_zscore, zscore_of_last};
pub use stationarity::{AdfResult, adf_test, mackinnon_p_value};
pub use window::SlidingWindow;
