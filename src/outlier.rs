// Outlier screening before significance testing
//
// Two screens, both of which report exactly what they removed:
// - z-score screen: |z| above a threshold, with z computed from the
//   population standard deviation (SIMD via trueno::Vector)
// - tail drops: the n largest or n smallest values of one sample, for known
//   one-sided outliers such as a few very long stints in one group
//
// Outliers are only ever removed on request; aggregation keeps every valid
// observation.

use serde::Serialize;
use trueno::Vector;

/// Conventional |z| cut-off
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Values kept and values removed by a screen, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreenResult {
    pub kept: Vec<f64>,
    pub removed: Vec<f64>,
}

impl ScreenResult {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Population z-scores of every value
///
/// Returns zeros when the sample is constant (no value deviates).
pub fn zscores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let as_f32: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let vec = Vector::from_slice(&as_f32);

    // trueno returns Result for mean and stddev
    let (Ok(mean), Ok(std)) = (vec.mean(), vec.stddev()) else {
        return vec![0.0; values.len()];
    };
    let (mean, std) = (f64::from(mean), f64::from(std));

    if std.abs() < 1e-12 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - mean) / std).collect()
}

/// Remove values whose |z| exceeds `threshold`
///
/// # Example
/// ```
/// use pitwall::outlier::zscore_screen;
///
/// let mut deltas = vec![0.3; 20];
/// deltas.push(9.0);
/// let screen = zscore_screen(&deltas, 3.0);
/// assert_eq!(screen.removed, vec![9.0]);
/// ```
pub fn zscore_screen(values: &[f64], threshold: f64) -> ScreenResult {
    let mut result = ScreenResult::default();
    for (value, z) in values.iter().zip(zscores(values)) {
        if z.abs() > threshold {
            result.removed.push(*value);
        } else {
            result.kept.push(*value);
        }
    }

    if !result.removed.is_empty() {
        tracing::info!(
            removed = result.removed.len(),
            threshold,
            "z-score screen removed outliers"
        );
    }
    result
}

/// Which end of a sample a tail drop removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tail {
    Largest,
    Smallest,
}

/// Remove the `n` values at one end of the sample
///
/// Equal values are removed in input order. Kept values stay in input order.
pub fn drop_tail(values: &[f64], n: usize, tail: Tail) -> ScreenResult {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| {
        let by_value = match tail {
            Tail::Largest => values[j].total_cmp(&values[i]),
            Tail::Smallest => values[i].total_cmp(&values[j]),
        };
        by_value.then(i.cmp(&j))
    });

    let mut drop = vec![false; values.len()];
    for &idx in order.iter().take(n) {
        drop[idx] = true;
    }

    let mut result = ScreenResult::default();
    for (value, dropped) in values.iter().zip(drop) {
        if dropped {
            result.removed.push(*value);
        } else {
            result.kept.push(*value);
        }
    }

    if !result.removed.is_empty() {
        tracing::info!(removed = ?result.removed, ?tail, "dropped tail values");
    }
    result
}

/// Remove the `n` largest values
///
/// # Example
/// ```
/// use pitwall::outlier::drop_largest;
///
/// let stints = [1150.0, 1210.0, 4100.0, 1180.0, 3900.0];
/// let screen = drop_largest(&stints, 2);
/// assert_eq!(screen.removed, vec![4100.0, 3900.0]);
/// ```
pub fn drop_largest(values: &[f64], n: usize) -> ScreenResult {
    drop_tail(values, n, Tail::Largest)
}

/// Remove the `n` smallest values
pub fn drop_smallest(values: &[f64], n: usize) -> ScreenResult {
    drop_tail(values, n, Tail::Smallest)
}

/// How many values to cut from each end of one sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailDrops {
    pub largest: usize,
    pub smallest: usize,
}

impl TailDrops {
    pub fn new(largest: usize, smallest: usize) -> Self {
        Self { largest, smallest }
    }

    pub fn is_empty(&self) -> bool {
        self.largest == 0 && self.smallest == 0
    }
}

/// Run the z-score screen (when a threshold is given), then the tail drops
/// on what it kept
pub fn apply_screens(
    values: &[f64],
    zscore_threshold: Option<f64>,
    drops: TailDrops,
) -> ScreenResult {
    let mut result = match zscore_threshold {
        Some(threshold) => zscore_screen(values, threshold),
        None => ScreenResult {
            kept: values.to_vec(),
            removed: Vec::new(),
        },
    };
    for (n, tail) in [(drops.largest, Tail::Largest), (drops.smallest, Tail::Smallest)] {
        if n > 0 {
            let dropped = drop_tail(&result.kept, n, tail);
            result.removed.extend(dropped.removed);
            result.kept = dropped.kept;
        }
    }
    result
}
