//! Pearson correlation between two paired samples
//!
//! Used for start position vs grid-to-finish delta: does a car that starts
//! further back gain more places?

use crate::error::{AnalysisError, Result};
use crate::stats;
use crate::table::Table;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

/// Verbal strength of |r|
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl Strength {
    /// 0.0-0.19 very weak, 0.2-0.39 weak, 0.4-0.59 moderate, 0.6-0.79 strong, 0.8+ very strong
    pub fn from_r(r: f64) -> Self {
        let r = r.abs();
        if r < 0.2 {
            Strength::VeryWeak
        } else if r < 0.4 {
            Strength::Weak
        } else if r < 0.6 {
            Strength::Moderate
        } else if r < 0.8 {
            Strength::Strong
        } else {
            Strength::VeryStrong
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strength::VeryWeak => "very weak / no correlation",
            Strength::Weak => "weak correlation",
            Strength::Moderate => "moderate correlation",
            Strength::Strong => "strong correlation",
            Strength::VeryStrong => "very strong correlation",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub r: f64,
    /// Two-tailed p-value for H0: r = 0
    pub p_value: f64,
    pub n: usize,
    pub strength: Strength,
}

impl Correlation {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Pearson's r with a two-tailed p-value from Student's t with n - 2 df
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation> {
    if x.len() != y.len() {
        return Err(AnalysisError::insufficient(format!(
            "paired samples differ in length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 3 {
        return Err(AnalysisError::insufficient(format!(
            "correlation needs at least 3 pairs, got {}",
            n
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AnalysisError::insufficient(
            "paired samples contain non-finite values",
        ));
    }

    let mean_x = stats::mean(x).unwrap_or_default();
    let mean_y = stats::mean(y).unwrap_or_default();

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return Err(AnalysisError::insufficient(
            "a sample has zero variance; correlation is undefined",
        ));
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;

    let p_value = if r.abs() == 1.0 {
        0.0
    } else {
        let t = r * (df / (1.0 - r * r)).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| AnalysisError::Stats(format!("Student's t: {}", e)))?;
        (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0)
    };

    tracing::debug!(r, p_value, n, "pearson correlation");

    Ok(Correlation {
        r,
        p_value,
        n,
        strength: Strength::from_r(r),
    })
}

/// Column pair read from a table, optionally restricted to rows where
/// `subject_column` equals `subject`
///
/// Rows with either cell blank or unparseable are skipped.
pub fn paired_columns(
    table: &Table,
    x_column: &str,
    y_column: &str,
    subject: Option<(&str, &str)>,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let xs = table.numeric_column(x_column)?;
    let ys = table.numeric_column(y_column)?;
    let keep: Vec<bool> = match subject {
        Some((column, wanted)) => {
            let idx = table.column_index(column)?;
            table.rows().iter().map(|row| row[idx].trim() == wanted).collect()
        }
        None => vec![true; table.len()],
    };

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut skipped = 0usize;
    for ((xi, yi), keep) in xs.into_iter().zip(ys).zip(keep) {
        if !keep {
            continue;
        }
        match (xi, yi) {
            (Some(xi), Some(yi)) => {
                x.push(xi);
                y.push(yi);
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::info!(skipped, "rows without both '{}' and '{}' skipped", x_column, y_column);
    }
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_positive() {
        let c = pearson(&[1.0, 2.0, 3.0, 4.0], &[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert!((c.r - 1.0).abs() < 1e-12);
        assert_eq!(c.p_value, 0.0);
        assert_eq!(c.strength, Strength::VeryStrong);
    }

    #[test]
    fn test_known_r_and_p() {
        // r = 0.8 exactly for this data; t = 0.8 * sqrt(3 / 0.36) = 2.3094, df = 3
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 5.0];
        let c = pearson(&x, &y).unwrap();
        assert!((c.r - 0.8).abs() < 1e-12);
        assert!((c.p_value - 0.1041).abs() < 1e-3);
        assert_eq!(c.strength, Strength::VeryStrong);
        assert!(!c.is_significant(0.05));
    }

    #[test]
    fn test_negative_correlation_strength() {
        let x = [20.0, 18.0, 15.0, 12.0, 10.0, 8.0];
        let y = [3.0, 4.0, 2.0, 1.0, 0.0, -2.0];
        let c = pearson(&x, &y).unwrap();
        assert!(c.r > 0.0);
        let inverted: Vec<f64> = y.iter().map(|v| -v).collect();
        let neg = pearson(&x, &inverted).unwrap();
        assert!((neg.r + c.r).abs() < 1e-12);
        assert_eq!(neg.strength, c.strength);
    }

    #[test]
    fn test_too_few_pairs() {
        assert!(matches!(
            pearson(&[1.0, 2.0], &[3.0, 4.0]),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_zero_variance() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        assert!(pearson(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_paired_columns_by_subject() {
        let table = Table::from_csv_str(
            "constructor_ref,start_position,grid_delta\n\
             williams,18,3\n\
             renault,10,-1\n\
             williams,12,\n\
             williams,15,1\n",
        )
        .unwrap();
        let (x, y) = paired_columns(
            &table,
            "start_position",
            "grid_delta",
            Some(("constructor_ref", "williams")),
        )
        .unwrap();
        assert_eq!(x, vec![18.0, 15.0]);
        assert_eq!(y, vec![3.0, 1.0]);

        let (all_x, _) = paired_columns(&table, "start_position", "grid_delta", None).unwrap();
        assert_eq!(all_x.len(), 3);
        assert!(matches!(
            paired_columns(&table, "grid", "grid_delta", None),
            Err(AnalysisError::Schema { .. })
        ));
    }

    #[test]
    fn test_strength_bands() {
        assert_eq!(Strength::from_r(0.19), Strength::VeryWeak);
        assert_eq!(Strength::from_r(-0.25), Strength::Weak);
        assert_eq!(Strength::from_r(0.573), Strength::Moderate);
        assert_eq!(Strength::from_r(0.6), Strength::Strong);
        assert_eq!(Strength::from_r(-0.95), Strength::VeryStrong);
    }
}
