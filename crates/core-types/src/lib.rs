//! # Quantlab Core Types
//!
//! The shared vocabulary of the workspace: price bars, signals, positions,
//! trades and the result of a backtest run.
//!
//! This is a Layer 0 crate. It has no knowledge of strategies, statistics or
//! execution, and every other crate depends on it.

pub mod enums;
pub mod error;
pub mod provider;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Direction, StrategyId};
pub use error::CoreError;
pub use provider::PriceSeriesProvider;
pub use structs::{
    HedgeLeg, MarketData, Position, PriceBar, PriceSeries, ResultSeries, Signal, Trade,
};
