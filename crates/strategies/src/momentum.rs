use crate::error::StrategyError;
use crate::Strategy;
use configuration::MomentumParams;
use core_types::{Direction, MarketData, Signal, StrategyId};
use ta::indicators::StandardDeviation;
use ta::Next;

/// Trailing-return momentum.
///
/// The direction is the sign of the `window`-bar return. Strength is that
/// return measured in units of its expected spread under a random walk,
/// `σ₁ √window`, where `σ₁` is the standard deviation of one-bar returns over
/// the same window.
#[derive(Debug, Clone)]
pub struct Momentum {
    params: MomentumParams,
}

impl Momentum {
    pub fn new(params: MomentumParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &MomentumParams {
        &self.params
    }
}

impl Strategy for Momentum {
    fn id(&self) -> StrategyId {
        StrategyId::Momentum
    }

    fn min_lookback(&self) -> usize {
        self.params.window + 1
    }

    fn generate_signals(&self, data: &MarketData<'_>) -> Result<Vec<Signal>, StrategyError> {
        let window = self.params.window;
        let bars = data.prices.bars();
        let mut volatility = StandardDeviation::new(window)?;
        let mut signals = Vec::with_capacity(bars.len());

        for (t, bar) in bars.iter().enumerate() {
            // One-bar return volatility, fed every bar so the window stays current.
            let sigma = if t > 0 {
                Some(volatility.next(bar.close / bars[t - 1].close - 1.0))
            } else {
                None
            };

            if t < window {
                signals.push(Signal::flat(bar.timestamp));
                continue;
            }

            let trailing = bar.close / bars[t - window].close - 1.0;
            if !trailing.is_finite() {
                signals.push(Signal::flat(bar.timestamp));
                continue;
            }

            let direction = Direction::from_sign(trailing);
            let strength = match sigma {
                Some(s) if s > 0.0 => trailing.abs() / (s * (window as f64).sqrt()),
                _ => 1.0,
            };
            tracing::trace!(t, trailing, ?direction, strength, "Momentum evaluated");
            signals.push(Signal::new(bar.timestamp, direction, strength));
        }

        Ok(signals)
    }

    fn size_fraction(&self, signal: &Signal, default_fraction: f64) -> Option<f64> {
        self.params
            .volatility_scaled
            .then(|| default_fraction * signal.strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use core_types::{PriceBar, PriceSeries};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PriceBar::flat(start + Duration::days(i as i64), *c))
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    fn momentum(window: usize) -> Momentum {
        Momentum::new(MomentumParams {
            window,
            volatility_scaled: false,
        })
        .unwrap()
    }

    #[test]
    fn rising_series_is_long_after_warmup() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let prices = series(&closes);
        let signals = momentum(20).generate_signals(&MarketData::new(&prices)).unwrap();

        assert_eq!(signals.len(), 100);
        assert!(signals[..20].iter().all(|s| s.direction == Direction::Flat));
        assert!(signals[20..].iter().all(|s| s.direction == Direction::Long));
        assert!(signals[20..].iter().all(|s| s.strength > 0.0 && s.strength <= 1.0));
    }

    #[test]
    fn falling_series_is_short() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
        let prices = series(&closes);
        let signals = momentum(10).generate_signals(&MarketData::new(&prices)).unwrap();
        assert_eq!(signals[39].direction, Direction::Short);
    }

    #[test]
    fn volatility_scaling_uses_strength() {
        let strategy = Momentum::new(MomentumParams {
            window: 5,
            volatility_scaled: true,
        })
        .unwrap();
        let signal = Signal::new(Utc::now(), Direction::Long, 0.5);
        assert_eq!(strategy.size_fraction(&signal, 0.8), Some(0.4));
        assert_eq!(momentum(5).size_fraction(&signal, 0.8), None);
    }

    #[test]
    fn rejects_invalid_window() {
        assert!(Momentum::new(MomentumParams {
            window: 0,
            volatility_scaled: false
        })
        .is_err());
    }
}
