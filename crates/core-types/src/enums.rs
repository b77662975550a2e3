use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Direction of a signal or side of a position.
///
/// A signal's direction maps to `-1`, `0` or `+1`; `Flat` means no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    Short,
    #[default]
    Flat,
    Long,
}

impl Direction {
    /// Returns the opposite direction. `Flat` stays `Flat`.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
            Direction::Flat => Direction::Flat,
        }
    }

    /// The numeric sign of the direction: `-1`, `0` or `+1`.
    pub fn as_i8(&self) -> i8 {
        match self {
            Direction::Short => -1,
            Direction::Flat => 0,
            Direction::Long => 1,
        }
    }

    pub fn sign(&self) -> f64 {
        f64::from(self.as_i8())
    }

    /// Maps the sign of a value to a direction. Zero and NaN map to `Flat`.
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Direction::Long
        } else if value < 0.0 {
            Direction::Short
        } else {
            Direction::Flat
        }
    }

    pub fn is_flat(&self) -> bool {
        *self == Direction::Flat
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Short => "Short",
            Direction::Flat => "Flat",
            Direction::Long => "Long",
        };
        f.write_str(name)
    }
}

/// Identifies which strategy implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    Momentum,
    MeanReversion,
    StatisticalArbitrage,
}

impl StrategyId {
    pub const ALL: [StrategyId; 3] = [
        StrategyId::Momentum,
        StrategyId::MeanReversion,
        StrategyId::StatisticalArbitrage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Momentum => "momentum",
            StrategyId::MeanReversion => "mean_reversion",
            StrategyId::StatisticalArbitrage => "statistical_arbitrage",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "momentum" => Ok(StrategyId::Momentum),
            "mean_reversion" => Ok(StrategyId::MeanReversion),
            "statistical_arbitrage" | "stat_arb" => Ok(StrategyId::StatisticalArbitrage),
            other => Err(CoreError::InvalidInput(
                "strategy id".to_string(),
                format!("unknown strategy '{}'", other),
            )),
        }
    }
}
