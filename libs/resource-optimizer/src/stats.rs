pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n-1 denominator), matching `statistics.variance`.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    sum_sq / (values.len() - 1) as f64
}

pub fn stdev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Pearson correlation between `0..n` and `values`, used as a simple
/// linear-trend signal.
pub fn trend_correlation(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mean_x = mean(&xs);
    let mean_y = mean(values);

    let numerator: f64 = xs.iter().zip(values).map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let denom_x: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    let denom_y: f64 = values.iter().map(|y| (y - mean_y).powi(2)).sum();

    if denom_x == 0.0 || denom_y == 0.0 {
        return None;
    }
    Some(numerator / (denom_x * denom_y).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn variance_of_single_value_is_zero() {
        assert_eq!(variance(&[5.0]), 0.0);
    }

    #[test]
    fn perfectly_increasing_series_has_correlation_near_one() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let corr = trend_correlation(&values).unwrap();
        assert!((corr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_series_has_no_correlation() {
        let values = vec![5.0; 20];
        assert!(trend_correlation(&values).is_none());
    }
}
