//! Trailing-window statistics. Output index `i` covers `values[i + 1 - window ..= i]`;
//! positions without a full window are `None`.

use crate::descriptive::{mean, sample_std};

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

/// Z-score of each value against its own trailing window.
pub fn rolling_zscore(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, zscore_of_last)
}

/// Z-score of the last element against the mean and sample std of the whole
/// slice. `None` when the std is zero or undefined.
pub fn zscore_of_last(values: &[f64]) -> Option<f64> {
    let last = *values.last()?;
    let m = mean(values)?;
    let sd = sample_std(values)?;
    (sd > 0.0).then(|| (last - m) / sd)
}

fn rolling<F>(values: &[f64], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                stat(&values[i + 1 - window..=i])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_positions_are_none() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let means = rolling_mean(&values, 3);
        assert_eq!(means, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn zscore_of_constant_window_is_undefined() {
        let values = [5.0; 10];
        assert!(rolling_zscore(&values, 5).iter().all(Option::is_none));
    }

    #[test]
    fn zscore_sign_follows_last_value() {
        assert!(zscore_of_last(&[1.0, 1.0, 1.0, 2.0]).unwrap() > 0.0);
        assert!(zscore_of_last(&[2.0, 2.0, 2.0, 1.0]).unwrap() < 0.0);
        assert_eq!(rolling_std(&[1.0, 3.0], 2), vec![None, Some(2.0_f64.sqrt())]);
    }
}
