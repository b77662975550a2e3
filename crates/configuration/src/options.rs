//! Strongly typed strategy parameters from a plain options mapping.
//!
//! Callers that do not use `config.toml` describe a strategy with a map of
//! numeric options. Keys the selected strategy does not recognise are
//! rejected, missing keys keep their defaults, and the result is validated.

use crate::error::ConfigError;
use crate::settings::{MeanReversionParams, MomentumParams, StatArbParams, Strategies};
use core_types::StrategyId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A plain options mapping such as `{"window": 20.0, "threshold": 0.05}`.
pub type StrategyOptions = BTreeMap<String, f64>;

pub const WINDOW: &str = "window";
pub const THRESHOLD: &str = "threshold";
pub const VOLATILITY_SCALED: &str = "volatility_scaled";
pub const LOOKBACK_PERIOD: &str = "lookback_period";
pub const ENTRY_ZSCORE: &str = "entry_zscore";
pub const EXIT_ZSCORE: &str = "exit_zscore";
pub const MAX_POSITION_HOLD: &str = "max_position_hold";
pub const MIN_HALF_LIFE: &str = "min_half_life";
pub const CONFIDENCE_LEVEL: &str = "confidence_level";

/// Selects a strategy and overrides some of its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: StrategyId,
    #[serde(default)]
    pub options: StrategyOptions,
}

impl StrategyConfig {
    pub fn new(id: StrategyId) -> Self {
        Self {
            id,
            options: StrategyOptions::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: f64) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    /// Applies the options on top of `base`, returning a validated parameter set
    /// for the selected strategy.
    pub fn resolve(&self, base: &Strategies) -> Result<Strategies, ConfigError> {
        let mut resolved = base.clone();
        match self.id {
            StrategyId::Momentum => {
                resolved.momentum = MomentumParams::from_options_with(base.momentum, &self.options)?
            }
            StrategyId::MeanReversion => {
                resolved.mean_reversion =
                    MeanReversionParams::from_options_with(base.mean_reversion, &self.options)?
            }
            StrategyId::StatisticalArbitrage => {
                resolved.statistical_arbitrage =
                    StatArbParams::from_options_with(base.statistical_arbitrage, &self.options)?
            }
        }
        Ok(resolved)
    }
}

impl MomentumParams {
    pub fn from_options(options: &StrategyOptions) -> Result<Self, ConfigError> {
        Self::from_options_with(Self::default(), options)
    }

    fn from_options_with(mut params: Self, options: &StrategyOptions) -> Result<Self, ConfigError> {
        reject_unknown(options, &[WINDOW, VOLATILITY_SCALED])?;
        if let Some(window) = read_count(options, WINDOW)? {
            params.window = window;
        }
        if let Some(flag) = options.get(VOLATILITY_SCALED) {
            params.volatility_scaled = read_flag(VOLATILITY_SCALED, *flag)?;
        }
        params.validate()?;
        Ok(params)
    }
}

impl MeanReversionParams {
    pub fn from_options(options: &StrategyOptions) -> Result<Self, ConfigError> {
        Self::from_options_with(Self::default(), options)
    }

    fn from_options_with(mut params: Self, options: &StrategyOptions) -> Result<Self, ConfigError> {
        reject_unknown(options, &[WINDOW, THRESHOLD])?;
        if let Some(window) = read_count(options, WINDOW)? {
            params.window = window;
        }
        if let Some(threshold) = options.get(THRESHOLD) {
            params.threshold = *threshold;
        }
        params.validate()?;
        Ok(params)
    }
}

impl StatArbParams {
    pub fn from_options(options: &StrategyOptions) -> Result<Self, ConfigError> {
        Self::from_options_with(Self::default(), options)
    }

    fn from_options_with(mut params: Self, options: &StrategyOptions) -> Result<Self, ConfigError> {
        reject_unknown(
            options,
            &[
                LOOKBACK_PERIOD,
                ENTRY_ZSCORE,
                EXIT_ZSCORE,
                MAX_POSITION_HOLD,
                MIN_HALF_LIFE,
                CONFIDENCE_LEVEL,
            ],
        )?;
        if let Some(lookback) = read_count(options, LOOKBACK_PERIOD)? {
            params.lookback_period = lookback;
        }
        if let Some(hold) = read_count(options, MAX_POSITION_HOLD)? {
            params.max_position_hold = hold;
        }
        if let Some(v) = options.get(ENTRY_ZSCORE) {
            params.entry_zscore = *v;
        }
        if let Some(v) = options.get(EXIT_ZSCORE) {
            params.exit_zscore = *v;
        }
        if let Some(v) = options.get(MIN_HALF_LIFE) {
            params.min_half_life = *v;
        }
        if let Some(v) = options.get(CONFIDENCE_LEVEL) {
            params.confidence_level = *v;
        }
        params.validate()?;
        Ok(params)
    }
}

fn reject_unknown(options: &StrategyOptions, allowed: &[&str]) -> Result<(), ConfigError> {
    match options.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ConfigError::invalid(
            key.clone(),
            format!("not a recognised option (expected one of: {})", allowed.join(", ")),
        )),
        None => Ok(()),
    }
}

/// Reads a non-negative whole number such as a window length.
fn read_count(options: &StrategyOptions, key: &str) -> Result<Option<usize>, ConfigError> {
    let Some(&value) = options.get(key) else {
        return Ok(None);
    };
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(ConfigError::invalid(key, format!("must be a non-negative integer, got {}", value)));
    }
    Ok(Some(value as usize))
}

fn read_flag(key: &str, value: f64) -> Result<bool, ConfigError> {
    match value {
        v if v == 0.0 => Ok(false),
        v if v == 1.0 => Ok(true),
        other => Err(ConfigError::invalid(key, format!("must be 0 or 1, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, f64)]) -> StrategyOptions {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn missing_keys_keep_defaults() {
        let params = StatArbParams::from_options(&options(&[(ENTRY_ZSCORE, 2.5)])).unwrap();
        assert_eq!(params.entry_zscore, 2.5);
        assert_eq!(params.lookback_period, StatArbParams::default().lookback_period);
    }

    #[test]
    fn negative_window_is_invalid() {
        let err = MomentumParams::from_options(&options(&[(WINDOW, -5.0)])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { ref field, .. } if field == WINDOW));
    }

    #[test]
    fn keys_of_other_strategies_are_rejected() {
        let err = MeanReversionParams::from_options(&options(&[(ENTRY_ZSCORE, 2.0)])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { ref field, .. } if field == ENTRY_ZSCORE));
    }

    #[test]
    fn entry_below_exit_fails_fast() {
        let opts = options(&[(ENTRY_ZSCORE, 0.4), (EXIT_ZSCORE, 0.5)]);
        assert!(StatArbParams::from_options(&opts).is_err());
    }

    #[test]
    fn resolve_only_touches_selected_strategy() {
        let config = StrategyConfig::new(StrategyId::MeanReversion).with_option(WINDOW, 30.0);
        let resolved = config.resolve(&Strategies::default()).unwrap();
        assert_eq!(resolved.mean_reversion.window, 30);
        assert_eq!(resolved.momentum, MomentumParams::default());
    }
}
