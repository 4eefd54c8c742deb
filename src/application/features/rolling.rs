//! Trailing-window statistics over one player's time-ordered series.
//!
//! All functions return one value per input position, computed over the
//! window ending at that position. Minimum-observation thresholds matter:
//! they decide early-season values, so they are fixed here rather than
//! configurable (mean needs 1 observation, std needs 2 and is 0 before that).

use statrs::statistics::Statistics;

/// Rolling arithmetic mean over the trailing `window` values (minimum 1).
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i].iter().mean()
        })
        .collect()
}

/// Rolling sample standard deviation over the trailing `window` values.
/// 0 until 2 observations exist, unbiased (n-1) afterwards.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            if slice.len() < 2 {
                0.0
            } else {
                slice.iter().std_dev()
            }
        })
        .collect()
}

/// Period-over-period first difference; 0 at the first observation.
pub fn week_change(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| if i == 0 { 0.0 } else { v - values[i - 1] })
        .collect()
}

/// Trailing `span` mean minus the prior, non-overlapping `span` mean.
/// 0 until 2 * span observations exist.
pub fn trend_delta(values: &[f64], span: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < 2 * span {
                0.0
            } else {
                let recent = values[i + 1 - span..=i].iter().mean();
                let prior = values[i + 1 - 2 * span..i + 1 - span].iter().mean();
                recent - prior
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_rolling_mean_uses_min_available_periods() {
        let means = rolling_mean(&[10.0, 20.0, 30.0], 3);
        assert!((means[0] - 10.0).abs() < EPS);
        assert!((means[1] - 15.0).abs() < EPS);
        assert!((means[2] - 20.0).abs() < EPS);
    }

    #[test]
    fn test_rolling_mean_drops_values_outside_window() {
        let means = rolling_mean(&[10.0, 20.0, 30.0, 40.0], 2);
        assert!((means[3] - 35.0).abs() < EPS);
    }

    #[test]
    fn test_rolling_std_is_zero_before_two_observations() {
        let stds = rolling_std(&[10.0, 20.0, 30.0], 3);
        assert_eq!(stds[0], 0.0);
        // Sample std of [10, 20] = sqrt(50).
        assert!((stds[1] - 50.0_f64.sqrt()).abs() < EPS);
        // Sample std of [10, 20, 30] = 10.
        assert!((stds[2] - 10.0).abs() < EPS);
    }

    #[test]
    fn test_week_change_starts_at_zero() {
        let changes = week_change(&[12.0, 18.0, 15.0]);
        assert_eq!(changes, vec![0.0, 6.0, -3.0]);
    }

    #[test]
    fn test_trend_delta_needs_two_full_spans() {
        let values = [1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0];
        let trends = trend_delta(&values, 3);
        assert_eq!(&trends[..5], &[0.0; 5]);
        // At index 5: mean(10,11,12) - mean(1,2,3) = 9.
        assert!((trends[5] - 9.0).abs() < EPS);
        // At index 6: mean(11,12,13) - mean(2,3,10) = 7.
        assert!((trends[6] - 7.0).abs() < EPS);
    }

    #[test]
    fn test_constant_series_has_zero_std_and_trend() {
        let values = [5.0; 8];
        assert!(rolling_std(&values, 5).iter().all(|v| v.abs() < EPS));
        assert!(trend_delta(&values, 3).iter().all(|v| v.abs() < EPS));
    }
}
