//! # Quantlab Strategy Library
//!
//! This crate contains the signal-generation logic for Quantlab. It defines a
//! universal `Strategy` trait and provides the Momentum, Mean Reversion and
//! Statistical Arbitrage implementations.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of data
//!   providers, persistence or execution. It depends only on `core-types`,
//!   `configuration` and `statistics`.
//! - **Strategy Agnostic Engine:** By using the `Strategy` trait, the `backtester`
//!   can run any strategy without knowing its internal details.
//! - **No hidden state:** `generate_signals` takes `&self` and builds its
//!   indicators from scratch on every call, so one strategy instance can be
//!   shared by concurrent runs.
//!
//! ## Public API
//!
//! - `Strategy`: The core trait all strategies implement.
//! - `create_strategy` / `strategy_from_config`: factory functions.
//! - The concrete strategy structs themselves (e.g., `Momentum`).

pub mod error;
pub mod factory;
pub mod mean_reversion;
pub mod momentum;
pub mod stat_arb;

pub use error::StrategyError;
pub use factory::{create_strategy, strategy_from_config};
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;
pub use stat_arb::{HedgePairState, PairTrader, StatisticalArbitrage};

pub use core_types::StrategyId;

use core_types::{MarketData, Signal};

/// The core trait that all trading strategies must implement.
///
/// The `Send + Sync` bounds are required to allow one strategy to be shared by
/// the parallel batch runner.
pub trait Strategy: Send + Sync {
    fn id(&self) -> StrategyId;

    fn name(&self) -> &'static str {
        self.id().as_str()
    }

    /// Fewest bars the strategy needs before a backtest is meaningful.
    fn min_lookback(&self) -> usize;

    /// Pairs strategies need `MarketData::benchmark` to be set.
    fn requires_benchmark(&self) -> bool {
        false
    }

    /// Produces exactly one signal per bar of `data.prices`.
    ///
    /// The signal at index `t` may only depend on bars `..=t`.
    fn generate_signals(&self, data: &MarketData<'_>) -> Result<Vec<Signal>, StrategyError>;

    /// Overrides the fraction of equity committed to a new position.
    ///
    /// `None` keeps the engine's default `position_fraction`.
    fn size_fraction(&self, _signal: &Signal, _default_fraction: f64) -> Option<f64> {
        None
    }
}
