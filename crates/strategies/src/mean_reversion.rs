use crate::error::StrategyError;
use crate::Strategy;
use configuration::MeanReversionParams;
use core_types::{Direction, MarketData, Signal, StrategyId};
use ta::indicators::{SimpleMovingAverage as Sma, StandardDeviation};
use ta::Next;

/// Bounds on how far the realised-volatility regime can move the threshold.
const MIN_REGIME_SCALE: f64 = 0.5;
const MAX_REGIME_SCALE: f64 = 2.0;

/// Z-score at which a signal reaches full strength.
const FULL_STRENGTH_ZSCORE: f64 = 3.0;

/// Rolling z-score mean reversion with a volatility-adaptive threshold.
///
/// Goes short when price is stretched above its `window`-bar mean and long when
/// stretched below, then exits once the z-score crosses back through zero.
#[derive(Debug, Clone)]
pub struct MeanReversion {
    params: MeanReversionParams,
}

impl MeanReversion {
    pub fn new(params: MeanReversionParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &MeanReversionParams {
        &self.params
    }

    /// Threshold scaled by the ratio of recent to long-run return volatility.
    fn effective_threshold(&self, recent_vol: f64, long_vol: f64) -> f64 {
        let scale = if long_vol > 0.0 && recent_vol.is_finite() {
            (recent_vol / long_vol).clamp(MIN_REGIME_SCALE, MAX_REGIME_SCALE)
        } else {
            1.0
        };
        self.params.threshold * scale
    }
}

/// Expanding population variance (Welford).
#[derive(Debug, Default)]
struct ExpandingVolatility {
    count: usize,
    mean: f64,
    m2: f64,
}

impl ExpandingVolatility {
    fn next(&mut self, value: f64) -> f64 {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        (self.m2 / self.count as f64).sqrt()
    }
}

impl Strategy for MeanReversion {
    fn id(&self) -> StrategyId {
        StrategyId::MeanReversion
    }

    fn min_lookback(&self) -> usize {
        self.params.window + 1
    }

    fn generate_signals(&self, data: &MarketData<'_>) -> Result<Vec<Signal>, StrategyError> {
        let window = self.params.window;
        let bars = data.prices.bars();

        let mut mean = Sma::new(window)?;
        let mut deviation = StandardDeviation::new(window)?;
        let mut recent_vol = StandardDeviation::new(window)?;
        let mut long_vol = ExpandingVolatility::default();

        let mut held = Direction::Flat;
        let mut signals = Vec::with_capacity(bars.len());

        for (t, bar) in bars.iter().enumerate() {
            let sma = mean.next(bar.close);
            let sd = deviation.next(bar.close);
            let vols = (t > 0).then(|| {
                let r = bar.close / bars[t - 1].close - 1.0;
                (recent_vol.next(r), long_vol.next(r))
            });

            let zscore = (sd > 0.0).then(|| (bar.close - sma) / sd);
            let (Some(z), Some((recent, long)), true) = (zscore, vols, t >= window) else {
                // A flat signal closes any open position, so a later entry must
                // clear the threshold again.
                held = Direction::Flat;
                signals.push(Signal::flat(bar.timestamp));
                continue;
            };

            let threshold = self.effective_threshold(recent, long);

            // Exit on a zero crossing, then look for a fresh entry.
            held = match held {
                Direction::Long if z >= 0.0 => Direction::Flat,
                Direction::Short if z <= 0.0 => Direction::Flat,
                other => other,
            };
            if held.is_flat() {
                if z > threshold {
                    held = Direction::Short;
                } else if z < -threshold {
                    held = Direction::Long;
                }
            }

            tracing::trace!(t, z, threshold, ?held, "MeanReversion evaluated");
            let strength = (z.abs() / FULL_STRENGTH_ZSCORE).min(1.0);
            signals.push(Signal::new(bar.timestamp, held, strength));
        }

        Ok(signals)
    }
}
