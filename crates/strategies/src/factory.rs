use crate::error::StrategyError;
use crate::mean_reversion::MeanReversion;
use crate::momentum::Momentum;
use crate::stat_arb::StatisticalArbitrage;
use crate::Strategy;
use configuration::{StrategyConfig, Strategies};
use core_types::StrategyId;

/// Creates a new strategy instance from its validated parameter set.
///
/// The match is exhaustive, so the compiler will error if a new `StrategyId`
/// is added but not handled here.
pub fn create_strategy(
    id: StrategyId,
    params: &Strategies,
) -> Result<Box<dyn Strategy>, StrategyError> {
    match id {
        StrategyId::Momentum => Ok(Box::new(Momentum::new(params.momentum)?)),
        StrategyId::MeanReversion => Ok(Box::new(MeanReversion::new(params.mean_reversion)?)),
        StrategyId::StatisticalArbitrage => Ok(Box::new(StatisticalArbitrage::new(
            params.statistical_arbitrage,
        )?)),
    }
}

/// Applies a plain options mapping on top of `base` and builds the strategy.
pub fn strategy_from_config(
    config: &StrategyConfig,
    base: &Strategies,
) -> Result<Box<dyn Strategy>, StrategyError> {
    let resolved = config.resolve(base)?;
    create_strategy(config.id, &resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::options::{ENTRY_ZSCORE, WINDOW};

    #[test]
    fn builds_every_strategy_from_defaults() {
        for id in StrategyId::ALL {
            let strategy = create_strategy(id, &Strategies::default()).unwrap();
            assert_eq!(strategy.id(), id);
        }
    }

    #[test]
    fn options_flow_into_min_lookback() {
        let config = StrategyConfig::new(StrategyId::Momentum).with_option(WINDOW, 30.0);
        let strategy = strategy_from_config(&config, &Strategies::default()).unwrap();
        assert_eq!(strategy.min_lookback(), 31);
    }

    #[test]
    fn invalid_options_fail_fast() {
        let config = StrategyConfig::new(StrategyId::StatisticalArbitrage).with_option(ENTRY_ZSCORE, 0.1);
        assert!(matches!(
            strategy_from_config(&config, &Strategies::default()),
            Err(StrategyError::InvalidParameters(_))
        ));
    }
}
