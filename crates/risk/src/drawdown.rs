use crate::error::RiskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Drawdown statistics of an equity curve. Drawdowns are fractions of the
/// running peak and therefore never positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownMetrics {
    pub max_drawdown: f64,
    /// Mean drawdown over the bars spent below the running peak; 0 if none.
    pub average_drawdown: f64,
    /// Fraction of bars spent below the running peak.
    pub drawdown_frequency: f64,
    /// Number of distinct peak-to-recovery episodes, recovered or not.
    pub drawdown_episodes: usize,
    /// Episodes still below their peak at the end of the series.
    pub unrecovered_drawdowns: usize,
    /// Mean bars from trough to recovery over recovered episodes.
    pub average_recovery_bars: Option<f64>,
    #[serde(with = "humantime_serde")]
    pub average_recovery_time: Option<Duration>,
}

/// `(equity - running_max) / running_max` per bar.
///
/// Equity may fall to zero or below once a positive peak exists, giving
/// drawdowns of -1 or less. The running peak itself must be positive.
pub fn drawdown_series(equity: &[f64]) -> Result<Vec<f64>, RiskError> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&value| {
            if !value.is_finite() {
                return Err(RiskError::InvalidEquity(format!(
                    "equity must be finite, got {value}"
                )));
            }
            peak = peak.max(value);
            if peak <= 0.0 {
                return Err(RiskError::InvalidEquity(format!(
                    "running peak must be positive, got {peak}"
                )));
            }
            Ok((value - peak) / peak)
        })
        .collect()
}

struct Episode {
    trough_index: usize,
    trough_drawdown: f64,
}

pub(crate) fn drawdown_metrics(
    timestamps: &[DateTime<Utc>],
    equity: &[f64],
) -> Result<DrawdownMetrics, RiskError> {
    if timestamps.len() != equity.len() {
        return Err(RiskError::LengthMismatch {
            timestamps: timestamps.len(),
            values: equity.len(),
        });
    }
    let drawdowns = drawdown_series(equity)?;

    let mut max_drawdown = 0.0_f64;
    let mut underwater_sum = 0.0;
    let mut underwater_bars = 0usize;
    let mut episodes = 0usize;
    let mut recoveries: Vec<(usize, chrono::Duration)> = Vec::new();
    let mut open: Option<Episode> = None;

    for (i, &dd) in drawdowns.iter().enumerate() {
        max_drawdown = max_drawdown.min(dd);

        if dd < 0.0 {
            underwater_sum += dd;
            underwater_bars += 1;
            match open.as_mut() {
                Some(episode) if dd < episode.trough_drawdown => {
                    episode.trough_index = i;
                    episode.trough_drawdown = dd;
                }
                Some(_) => {}
                None => {
                    episodes += 1;
                    open = Some(Episode {
                        trough_index: i,
                        trough_drawdown: dd,
                    });
                }
            }
        } else if let Some(episode) = open.take() {
            // Back at or above the pre-episode peak.
            recoveries.push((
                i - episode.trough_index,
                timestamps[i] - timestamps[episode.trough_index],
            ));
        }
    }

    let unrecovered_drawdowns = usize::from(open.is_some());
    let (average_recovery_bars, average_recovery_time) = if recoveries.is_empty() {
        (None, None)
    } else {
        let count = recoveries.len();
        let bars = recoveries.iter().map(|(b, _)| *b).sum::<usize>() as f64 / count as f64;
        let total: chrono::Duration = recoveries.iter().map(|(_, d)| *d).sum();
        let average = (total / count as i32).to_std().ok();
        (Some(bars), average)
    };

    Ok(DrawdownMetrics {
        max_drawdown,
        average_drawdown: if underwater_bars > 0 {
            underwater_sum / underwater_bars as f64
        } else {
            0.0
        },
        drawdown_frequency: if drawdowns.is_empty() {
            0.0
        } else {
            underwater_bars as f64 / drawdowns.len() as f64
        },
        drawdown_episodes: episodes,
        unrecovered_drawdowns,
        average_recovery_bars,
        average_recovery_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn days(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n as i64).map(|d| start + chrono::Duration::days(d)).collect()
    }

    #[test]
    fn drawdowns_are_relative_to_the_running_peak() {
        let series = drawdown_series(&[100.0, 120.0, 90.0, 120.0]).unwrap();
        assert_eq!(series, vec![0.0, 0.0, -0.25, 0.0]);
    }

    #[test]
    fn recovery_runs_from_trough_to_new_peak() {
        // Peak at bar 1, trough at bar 3, recovered at bar 5.
        let equity = [100.0, 110.0, 100.0, 88.0, 99.0, 110.0, 105.0];
        let metrics = drawdown_metrics(&days(equity.len()), &equity).unwrap();

        assert!((metrics.max_drawdown + 0.2).abs() < 1e-12);
        assert_eq!(metrics.drawdown_episodes, 2);
        assert_eq!(metrics.unrecovered_drawdowns, 1);
        assert_eq!(metrics.average_recovery_bars, Some(2.0));
        assert_eq!(
            metrics.average_recovery_time,
            Some(Duration::from_secs(2 * 86_400))
        );
        assert!((metrics.drawdown_frequency - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn monotone_equity_has_no_drawdown() {
        let equity: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let metrics = drawdown_metrics(&days(30), &equity).unwrap();
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.average_drawdown, 0.0);
        assert_eq!(metrics.drawdown_frequency, 0.0);
        assert_eq!(metrics.average_recovery_time, None);
    }

    #[test]
    fn bounds_hold_for_random_walks() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let mut value = 1_000.0;
            let equity: Vec<f64> = (0..200)
                .map(|_| {
                    value *= 1.0 + rng.gen_range(-0.02..0.02);
                    value
                })
                .collect();
            let metrics = drawdown_metrics(&days(200), &equity).unwrap();
            assert!(metrics.max_drawdown <= 0.0);
            assert!(metrics.average_drawdown >= metrics.max_drawdown);
            assert!((0.0..=1.0).contains(&metrics.drawdown_frequency));
            assert!(metrics.unrecovered_drawdowns <= 1);
        }
    }

    #[test]
    fn wiped_out_equity_still_has_drawdowns() {
        let equity = [100.0, 50.0, 0.0, -20.0];
        assert_eq!(drawdown_series(&equity).unwrap(), vec![0.0, -0.5, -1.0, -1.2]);

        let metrics = drawdown_metrics(&days(4), &equity).unwrap();
        assert!((metrics.max_drawdown + 1.2).abs() < 1e-12);
        assert_eq!(metrics.drawdown_episodes, 1);
        assert_eq!(metrics.unrecovered_drawdowns, 1);
        assert_eq!(metrics.average_recovery_bars, None);
    }

    #[test]
    fn non_positive_peak_or_non_finite_equity_is_rejected() {
        assert!(matches!(
            drawdown_metrics(&days(2), &[0.0, 50.0]),
            Err(RiskError::InvalidEquity(_))
        ));
        assert!(matches!(
            drawdown_metrics(&days(2), &[100.0, f64::NAN]),
            Err(RiskError::InvalidEquity(_))
        ));
    }
}
