// Test decisions against a configurable significance level
//
// Both tests always run on the same pair of samples so their decisions can be
// read side by side. Sample sizes travel with every result and undersized
// samples are flagged rather than hidden.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::hypothesis::statistics::{one_tailed_p, rank_sum_statistic, welch_statistic};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the alternative hypothesis, sample A relative to sample B
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// H1: A is less than B
    Less,
    /// H1: A is greater than B
    Greater,
}

impl Direction {
    pub fn symbol(self) -> &'static str {
        match self {
            Direction::Less => "<",
            Direction::Greater => ">",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Less => "less",
            Direction::Greater => "greater",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    /// Welch's t-test
    ParametricUnequalVariance,
    /// Mann-Whitney U
    NonParametricRankBased,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestKind::ParametricUnequalVariance => "Welch's t-test",
            TestKind::NonParametricRankBased => "Mann-Whitney U",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    RejectNull,
    FailToReject,
}

impl Decision {
    /// Reject iff `p < alpha`
    pub fn from_p_value(p_value: f64, alpha: f64) -> Self {
        if p_value < alpha {
            Decision::RejectNull
        } else {
            Decision::FailToReject
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::RejectNull => "reject H0",
            Decision::FailToReject => "fail to reject H0",
        })
    }
}

/// Outcome of one two-sample comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub test_kind: TestKind,
    pub direction: Direction,
    /// t for Welch, U of sample A for Mann-Whitney
    pub statistic: f64,
    /// One-tailed p-value in `direction`
    pub p_value: f64,
    /// Two-tailed p-value the one-tailed value was derived from (Welch only)
    pub two_tailed_p: Option<f64>,
    /// Welch-Satterthwaite degrees of freedom (Welch only)
    pub df: Option<f64>,
    pub alpha: f64,
    pub decision: Decision,
    pub n_a: usize,
    pub n_b: usize,
}

impl TestResult {
    pub fn is_significant(&self) -> bool {
        self.decision == Decision::RejectNull
    }

    /// Either sample is below `threshold` observations
    pub fn is_small_sample(&self, threshold: usize) -> bool {
        self.n_a < threshold || self.n_b < threshold
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig(format!(
            "significance level must be in (0, 1), got {}",
            alpha
        )))
    }
}

/// One-tailed Welch's t-test
///
/// # Example
/// ```
/// use pitwall::hypothesis::{welch_t_test, Direction, Decision};
///
/// let williams = [23.5, 23.7, 24.1, 23.9, 24.4];
/// let rivals = [22.9, 23.0, 22.8, 23.1, 22.7];
///
/// let result = welch_t_test(&williams, &rivals, Direction::Greater, 0.05).unwrap();
/// assert_eq!(result.decision, Decision::RejectNull);
/// ```
pub fn welch_t_test(a: &[f64], b: &[f64], direction: Direction, alpha: f64) -> Result<TestResult> {
    check_alpha(alpha)?;
    let welch = welch_statistic(a, b)?;
    let p_value = one_tailed_p(welch.two_tailed_p, welch.mean_a - welch.mean_b, direction);

    tracing::debug!(
        t = welch.statistic,
        p_two_tailed = welch.two_tailed_p,
        p_one_tailed = p_value,
        "welch t-test"
    );

    Ok(TestResult {
        test_kind: TestKind::ParametricUnequalVariance,
        direction,
        statistic: welch.statistic,
        p_value,
        two_tailed_p: Some(welch.two_tailed_p),
        df: Some(welch.df),
        alpha,
        decision: Decision::from_p_value(p_value, alpha),
        n_a: a.len(),
        n_b: b.len(),
    })
}

/// One-tailed Mann-Whitney U test
pub fn mann_whitney_u(a: &[f64], b: &[f64], direction: Direction, alpha: f64) -> Result<TestResult> {
    check_alpha(alpha)?;
    let rank_sum = rank_sum_statistic(a, b, direction)?;

    tracing::debug!(
        u = rank_sum.u,
        p = rank_sum.p_value,
        exact = rank_sum.exact,
        "mann-whitney u"
    );

    Ok(TestResult {
        test_kind: TestKind::NonParametricRankBased,
        direction,
        statistic: rank_sum.u,
        p_value: rank_sum.p_value,
        two_tailed_p: None,
        df: None,
        alpha,
        decision: Decision::from_p_value(rank_sum.p_value, alpha),
        n_a: a.len(),
        n_b: b.len(),
    })
}

/// Parametric and non-parametric results over the same samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPair {
    pub label_a: String,
    pub label_b: String,
    pub n_a: usize,
    pub n_b: usize,
    /// Either sample is below the configured small-sample threshold
    pub small_sample: bool,
    pub parametric: TestResult,
    pub non_parametric: TestResult,
}

impl TestPair {
    /// Both tests reached the same decision
    pub fn agree(&self) -> bool {
        self.parametric.decision == self.non_parametric.decision
    }

    pub fn with_labels(mut self, label_a: impl Into<String>, label_b: impl Into<String>) -> Self {
        self.label_a = label_a.into();
        self.label_b = label_b.into();
        self
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        let direction = self.parametric.direction;

        report.push_str(&format!(
            "H0: {} {} {}\n",
            self.label_a,
            match direction {
                Direction::Less => ">=",
                Direction::Greater => "<=",
            },
            self.label_b
        ));
        report.push_str(&format!(
            "H1: {} {} {}\n",
            self.label_a,
            direction.symbol(),
            self.label_b
        ));
        report.push_str(&format!(
            "Significance level: {} ({}% confidence)\n",
            self.parametric.alpha,
            (1.0 - self.parametric.alpha) * 100.0
        ));
        report.push_str(&format!(
            "Sample sizes: {} = {}, {} = {}\n",
            self.label_a, self.n_a, self.label_b, self.n_b
        ));
        if self.small_sample {
            report.push_str("⚠️  Small sample: interpret p-values with care\n");
        }

        for result in [&self.parametric, &self.non_parametric] {
            report.push_str(&format!("\n📊 {}\n", result.test_kind));
            match result.test_kind {
                TestKind::ParametricUnequalVariance => {
                    report.push_str(&format!("  t-statistic: {:.3}\n", result.statistic));
                    if let Some(df) = result.df {
                        report.push_str(&format!("  degrees of freedom: {:.2}\n", df));
                    }
                    if let Some(p2) = result.two_tailed_p {
                        report.push_str(&format!("  two-tailed p-value: {:.4}\n", p2));
                    }
                }
                TestKind::NonParametricRankBased => {
                    report.push_str(&format!("  U statistic: {:.3}\n", result.statistic));
                }
            }
            report.push_str(&format!("  one-tailed p-value: {:.4}\n", result.p_value));
            report.push_str(&format!("  → {}\n", result.decision));
        }

        if !self.agree() {
            report.push_str("\n⚠️  The parametric and rank-based tests disagree\n");
        }

        report
    }
}

/// Run both tests on the same pair of samples
///
/// Fails with `InsufficientData` when either sample is below
/// `config.min_sample_size` or the samples are degenerate for either test.
pub fn compare_samples(
    a: &[f64],
    b: &[f64],
    direction: Direction,
    config: &AnalysisConfig,
) -> Result<TestPair> {
    config.validate()?;

    if a.len() < config.min_sample_size || b.len() < config.min_sample_size {
        return Err(AnalysisError::insufficient(format!(
            "samples have {} and {} observations (min_sample_size={})",
            a.len(),
            b.len(),
            config.min_sample_size
        )));
    }

    let alpha = config.significance_level;
    let parametric = welch_t_test(a, b, direction, alpha)?;
    let non_parametric = mann_whitney_u(a, b, direction, alpha)?;

    let small_sample = parametric.is_small_sample(config.small_sample_threshold);
    if small_sample {
        tracing::warn!(
            n_a = a.len(),
            n_b = b.len(),
            threshold = config.small_sample_threshold,
            "sample below small-sample threshold"
        );
    }

    Ok(TestPair {
        label_a: "A".to_string(),
        label_b: "B".to_string(),
        n_a: a.len(),
        n_b: b.len(),
        small_sample,
        parametric,
        non_parametric,
    })
}
