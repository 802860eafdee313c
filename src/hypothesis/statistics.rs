// Two-sample test statistics
//
// - Welch's t-test: unequal-variance t with Welch-Satterthwaite degrees of
//   freedom and a two-tailed p-value from statrs `StudentsT`. The one-tailed
//   value is derived from it according to the sign of the observed mean
//   difference.
// - Mann-Whitney U: ranks with average ties. Small tie-free samples use the
//   exact null distribution of U; everything else uses the normal
//   approximation with tie and continuity correction (statrs `Normal`).

use crate::error::{AnalysisError, Result};
use crate::hypothesis::verdict::Direction;
use crate::stats;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Largest smaller-sample size for which the exact U distribution is used
pub const EXACT_U_MAX_SMALLER_SAMPLE: usize = 8;

/// Raw Welch's t-test output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchStatistic {
    pub statistic: f64,
    pub two_tailed_p: f64,
    pub df: f64,
    pub mean_a: f64,
    pub mean_b: f64,
}

/// Raw Mann-Whitney U output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankSumStatistic {
    /// U for sample A
    pub u: f64,
    /// One-tailed p-value in the requested direction
    pub p_value: f64,
    /// Whether the exact null distribution was used
    pub exact: bool,
}

/// Reject samples no two-sample test can handle
pub(crate) fn check_samples(a: &[f64], b: &[f64]) -> Result<()> {
    for (label, sample) in [("A", a), ("B", b)] {
        if sample.len() < 2 {
            return Err(AnalysisError::insufficient(format!(
                "sample {} has {} observation(s), need at least 2",
                label,
                sample.len()
            )));
        }
        if sample.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::insufficient(format!(
                "sample {} contains non-finite values",
                label
            )));
        }
    }
    Ok(())
}

/// Welch's unequal-variance t-test
///
/// t and the Welch-Satterthwaite degrees of freedom are computed in f64; the
/// two-tailed p-value is the Student's t survival function at `|t|`, doubled.
pub fn welch_statistic(a: &[f64], b: &[f64]) -> Result<WelchStatistic> {
    check_samples(a, b)?;

    let (mean_a, var_a) = moments(a)?;
    let (mean_b, var_b) = moments(b)?;

    if var_a == 0.0 && var_b == 0.0 {
        return Err(AnalysisError::insufficient(
            "both samples have zero variance; the t statistic is undefined",
        ));
    }

    let se_a = var_a / a.len() as f64;
    let se_b = var_b / b.len() as f64;
    let se = se_a + se_b;

    let statistic = (mean_a - mean_b) / se.sqrt();
    let df = se * se
        / (se_a * se_a / (a.len() - 1) as f64 + se_b * se_b / (b.len() - 1) as f64);

    if !statistic.is_finite() || !df.is_finite() {
        return Err(AnalysisError::Stats(
            "t-test produced a non-finite result".to_string(),
        ));
    }

    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::Stats(format!("Student's t with df = {}: {}", df, e)))?;
    let two_tailed_p = (2.0 * dist.sf(statistic.abs())).clamp(0.0, 1.0);

    Ok(WelchStatistic {
        statistic,
        two_tailed_p,
        df,
        mean_a,
        mean_b,
    })
}

/// Mean and sample variance of a sample already checked by [`check_samples`]
fn moments(sample: &[f64]) -> Result<(f64, f64)> {
    match (stats::mean(sample), stats::variance(sample)) {
        (Some(mean), Some(variance)) => Ok((mean, variance)),
        _ => Err(AnalysisError::insufficient(
            "sample too small for a variance estimate",
        )),
    }
}

/// One-tailed p-value from a two-tailed one
///
/// Halving is only valid when the observed difference `mean_a - mean_b`
/// points in the hypothesised direction; otherwise the one-tailed value is
/// `1 - p/2`.
pub fn one_tailed_p(two_tailed_p: f64, mean_difference: f64, direction: Direction) -> f64 {
    let agrees = match direction {
        Direction::Less => mean_difference < 0.0,
        Direction::Greater => mean_difference > 0.0,
    };
    if agrees {
        two_tailed_p / 2.0
    } else {
        1.0 - two_tailed_p / 2.0
    }
}

/// Average ranks (1-based) of the pooled sample plus tie group sizes
pub(crate) fn rank_with_ties(pooled: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..pooled.len()).collect();
    order.sort_by(|&i, &j| pooled[i].total_cmp(&pooled[j]));

    let mut ranks = vec![0.0; pooled.len()];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && pooled[order[end]] == pooled[order[start]] {
            end += 1;
        }
        // positions start..end share the average of ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }
    (ranks, ties)
}

/// Null distribution of U for sample sizes `n1`, `n2` with no ties
///
/// Entry `u` is P(U = u). Built from the recurrence on which sample holds
/// the largest pooled value.
pub(crate) fn exact_u_distribution(n1: usize, n2: usize) -> Vec<f64> {
    // prev[i] holds the distribution for sizes (i, j - 1)
    let mut prev: Vec<Vec<f64>> = vec![vec![1.0]; n1 + 1];
    for j in 1..=n2 {
        let mut cur: Vec<Vec<f64>> = Vec::with_capacity(n1 + 1);
        cur.push(vec![1.0]);
        for i in 1..=n1 {
            let total = (i + j) as f64;
            let mut dist = vec![0.0; i * j + 1];
            // largest value from sample 1 beats all j values of sample 2
            for (u, p) in cur[i - 1].iter().enumerate() {
                dist[u + j] += p * i as f64 / total;
            }
            for (u, p) in prev[i].iter().enumerate() {
                dist[u] += p * j as f64 / total;
            }
            cur.push(dist);
        }
        prev = cur;
    }
    prev.swap_remove(n1)
}

/// Mann-Whitney U test, one-tailed in `direction`
///
/// `Greater` tests whether A is stochastically larger than B.
pub fn rank_sum_statistic(a: &[f64], b: &[f64], direction: Direction) -> Result<RankSumStatistic> {
    check_samples(a, b)?;

    let n1 = a.len();
    let n2 = b.len();
    let pooled: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let (ranks, ties) = rank_with_ties(&pooled);

    let rank_sum_a: f64 = ranks[..n1].iter().sum();
    let u1 = rank_sum_a - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;

    if ties.is_empty() && n1.min(n2) <= EXACT_U_MAX_SMALLER_SAMPLE {
        // U is symmetric in the sample sizes; build over the smaller one
        let dist = exact_u_distribution(n1.min(n2), n1.max(n2));
        let u = u1.round() as usize;
        let p_value = match direction {
            Direction::Greater => dist[u..].iter().sum::<f64>(),
            Direction::Less => dist[..=u].iter().sum::<f64>(),
        };
        return Ok(RankSumStatistic {
            u: u1,
            p_value: p_value.clamp(0.0, 1.0),
            exact: true,
        });
    }

    let n = (n1 + n2) as f64;
    let tie_term: f64 = ties
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum();
    let variance = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        return Err(AnalysisError::insufficient(
            "all observations are tied; the rank statistic is undefined",
        ));
    }
    let sigma = variance.sqrt();
    let mu = (n1 * n2) as f64 / 2.0;

    let u_directed = match direction {
        Direction::Greater => u1,
        Direction::Less => u2,
    };
    let z = (u_directed - mu - 0.5) / sigma;

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AnalysisError::Stats(format!("standard normal: {}", e)))?;

    Ok(RankSumStatistic {
        u: u1,
        p_value: normal.sf(z).clamp(0.0, 1.0),
        exact: false,
    })
}
