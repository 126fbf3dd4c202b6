//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap an angle into the range [-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let mut wrapped = angle % tau_t;

    if wrapped > pi_t {
        wrapped = wrapped - tau_t;
    }
    if wrapped < -pi_t {
        wrapped = wrapped + tau_t;
    }

    wrapped
}

/// Smooth a series with a centred moving average of the given window.
///
/// The window is clamped at the ends of the series so the output has the same
/// length as the input. Windows of 1 or less leave the series unchanged.
pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || series.len() < 2 {
        return series.to_vec();
    }

    let half = window / 2;
    let mut smoothed = Vec::with_capacity(series.len());

    for i in 0..series.len() {
        let start = i.saturating_sub(half);
        let end = usize::min(i + half + 1, series.len());

        let sum: f64 = series[start..end].iter().sum();
        smoothed.push(sum / (end - start) as f64);
    }

    smoothed
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0.0f64)).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI) - PI).abs() < 1e-9);
        assert!((wrap_pi(-3.0 * PI) + PI).abs() < 1e-9);
        assert!((wrap_pi(PI / 2.0) - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_preserves_length() {
        let series = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = moving_average(&series, 3);
        assert_eq!(smoothed.len(), series.len());

        // A linear series is unchanged away from the ends
        for i in 1..series.len() - 1 {
            assert!((smoothed[i] - series[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_moving_average_window_of_one_is_identity() {
        let series = vec![3.0, -1.0, 2.0];
        assert_eq!(moving_average(&series, 1), series);
    }
}
