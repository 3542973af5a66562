//! Automatic selection of the model size
//!
//! Locates the knee of the calibration error curve with a normalised
//! difference-curve search, then walks the cross-validation error curve
//! from the knee until its step size drops below the average step.

use tracing::debug;

/// Index of the knee of a decreasing error curve (0-based position in
/// `values`). Returns 0 when the curve is too short or flat to have one.
pub fn find_knee(values: &[f64]) -> usize {
    let n = values.len();
    if n < 3 {
        return 0;
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(max - min).is_finite() || max - min < 10.0 * f64::EPSILON {
        return 0;
    }

    let step = 1.0 / (n - 1) as f64;
    let x_norm: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();
    // Invert the curve so the knee becomes a peak of the difference curve
    let y_diff: Vec<f64> = values
        .iter()
        .zip(&x_norm)
        .map(|(&y, &x)| (1.0 - (y - min) / (max - min)) - x)
        .collect();

    let neighbor = |i: usize, offset: isize| {
        let j = (i as isize + offset).clamp(0, n as isize - 1) as usize;
        y_diff[j]
    };
    let maxima: Vec<usize> = (0..n)
        .filter(|&i| y_diff[i] >= neighbor(i, -1) && y_diff[i] >= neighbor(i, 1))
        .collect();
    let minima: Vec<usize> = (0..n)
        .filter(|&i| y_diff[i] <= neighbor(i, -1) && y_diff[i] <= neighbor(i, 1))
        .collect();
    let first_max = match maxima.first() {
        Some(&i) => i,
        None => return 0,
    };

    let mut threshold = 0.0;
    let mut threshold_index = 0;
    let mut next_max = 0;
    for i in first_max..n {
        if i + 1 == n {
            return 0;
        }
        if maxima.contains(&i) {
            threshold = y_diff[i] - step;
            threshold_index = i;
            next_max += 1;
            debug!(maximum = i, threshold, rank = next_max, "difference-curve peak");
        }
        if minima.contains(&i) {
            threshold = 0.0;
        }
        if y_diff[i + 1] < threshold {
            return threshold_index;
        }
    }
    0
}

/// Choose the optimal component count (1-based) from the calibration and
/// cross-validation error curves.
///
/// Starting at the knee of the calibration curve, the first
/// cross-validation step at or below the curve's average step size marks
/// the point where extra components stop paying for themselves. Falls back
/// to the full component count when every step stays above average.
pub fn choose_optimal_component(calibration_rmse: &[f64], cv_rmse: &[f64]) -> usize {
    if cv_rmse.len() < 2 {
        return cv_rmse.len().max(1);
    }
    let knee = find_knee(calibration_rmse).min(cv_rmse.len() - 1);
    let diffs: Vec<f64> = cv_rmse.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let threshold = diffs.iter().sum::<f64>() / diffs.len() as f64;

    for (i, &d) in diffs[knee..].iter().enumerate() {
        if d <= threshold {
            return i + knee + 1;
        }
    }
    cv_rmse.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knee_of_elbow_curve() {
        let rmse = [10.0, 6.0, 3.0, 1.0, 0.9, 0.8, 0.7, 0.6];
        assert_eq!(find_knee(&rmse), 3);
    }

    #[test]
    fn test_flat_or_short_curve_has_no_knee() {
        assert_eq!(find_knee(&[1.0, 1.0, 1.0, 1.0]), 0);
        assert_eq!(find_knee(&[5.0, 1.0]), 0);
        assert_eq!(find_knee(&[]), 0);
    }

    #[test]
    fn test_optimal_component_after_knee() {
        let rmsec = [10.0, 6.0, 3.0, 1.0, 0.9, 0.8, 0.7, 0.6];
        let rmsecv = [10.0, 6.0, 3.0, 1.0, 0.95, 0.9, 0.88, 0.87];
        assert_eq!(choose_optimal_component(&rmsec, &rmsecv), 4);
    }

    #[test]
    fn test_two_point_curve_selects_first_component() {
        // A single step always equals the average step
        let rmsec = [4.0, 2.0];
        let rmsecv = [4.0, 2.0];
        assert_eq!(choose_optimal_component(&rmsec, &rmsecv), 1);
    }

    #[test]
    fn test_single_component_curve() {
        assert_eq!(choose_optimal_component(&[1.0], &[1.0]), 1);
    }
}
