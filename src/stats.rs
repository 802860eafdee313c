//! Descriptive statistics over a single sample
//!
//! Mean and standard deviation are the Bessel-corrected sample estimators
//! (statrs). Median uses linear interpolation between order statistics, so an
//! even-sized sample reports the average of its two middle values. MAD is the
//! unscaled median of absolute deviations from the median.

use serde::Serialize;
use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty sample
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Sample variance (n - 1 denominator), `None` below two observations
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().variance())
}

/// Sample standard deviation, `None` below two observations
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Percentile from sorted data (linear interpolation)
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }

    let index = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        Some(sorted[lower])
    } else {
        let weight = index - lower as f64;
        Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
    }
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(&sorted_copy(values), 50.0)
}

/// Median absolute deviation from the median
pub fn mad(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Round half away from zero to `decimals` places
///
/// Negative zero is normalised to zero so reports never print `-0.000`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Unrounded summary of one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: Option<f64>,
    pub mad: f64,
}

impl Summary {
    /// Summarise a sample, `None` when it is empty
    pub fn of(values: &[f64]) -> Option<Self> {
        Some(Self {
            count: values.len(),
            mean: mean(values)?,
            median: median(values)?,
            std_dev: std_dev(values),
            mad: mad(values)?,
        })
    }

    /// Divide every location and spread statistic by `scale`
    pub fn scaled(self, scale: f64) -> Self {
        Self {
            count: self.count,
            mean: self.mean / scale,
            median: self.median / scale,
            std_dev: self.std_dev.map(|sd| sd / scale),
            mad: self.mad / scale,
        }
    }

    pub fn rounded(self, decimals: u32) -> Self {
        Self {
            count: self.count,
            mean: round_to(self.mean, decimals),
            median: round_to(self.median, decimals),
            std_dev: self.std_dev.map(|sd| round_to(sd, decimals)),
            mad: round_to(self.mad, decimals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_and_sample_std_dev() {
        let values = [10.0, 20.0, 30.0];
        assert!(approx(mean(&values).unwrap(), 20.0));
        assert!(approx(std_dev(&values).unwrap(), 10.0));
        assert!(approx(variance(&values).unwrap(), 100.0));
    }

    #[test]
    fn test_std_dev_needs_two_values() {
        assert_eq!(std_dev(&[100.0]), None);
        assert_eq!(std_dev(&[]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[23500.0, 24100.0, 23700.0]), Some(23700.0));
        assert_eq!(median(&[22900.0, 23000.0]), Some(22950.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mad() {
        // |23500-23700|, |23700-23700|, |24100-23700| -> [200, 0, 400]
        assert_eq!(mad(&[23500.0, 23700.0, 24100.0]), Some(200.0));
        assert_eq!(mad(&[22900.0, 23000.0]), Some(50.0));
        assert_eq!(mad(&[5.0]), Some(0.0));
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 100.0), Some(4.0));
        assert!(approx(percentile(&sorted, 50.0).unwrap(), 2.5));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.26797, 2), 3.27);
        assert_eq!(round_to(23.4567, 3), 23.457);
        assert_eq!(round_to(-0.0001, 3), 0.0);
        assert!(round_to(-0.0001, 3).is_sign_positive());
    }

    #[test]
    fn test_summary_scaled_and_rounded() {
        let summary = Summary::of(&[23500.0, 23700.0, 24100.0])
            .unwrap()
            .scaled(1000.0)
            .rounded(3);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.median, 23.7);
        assert_eq!(summary.mad, 0.2);
        assert_eq!(summary.mean, 23.767);
        assert_eq!(summary.std_dev, Some(0.306));
    }

    #[test]
    fn test_summary_of_single_value() {
        let summary = Summary::of(&[100.0]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.mad, 0.0);
        assert!(Summary::of(&[]).is_none());
    }
}
