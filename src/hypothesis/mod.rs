// Two-sample hypothesis testing
//
// A single parameterized wrapper serves every analysis area: it takes the two
// samples, the direction of the alternative hypothesis and the significance
// level, and runs a parametric and a non-parametric test on the same data.
//
// Implementation:
// - Welch's t-test with the Student's t survival function from statrs, the
//   one-tailed p-value derived from the sign of the observed mean difference
// - Mann-Whitney U with exact small-sample p-values, otherwise the normal
//   approximation from statrs
// - Degenerate input fails with InsufficientData instead of yielding NaN

mod statistics;
mod verdict;

pub use statistics::{
    one_tailed_p, rank_sum_statistic, welch_statistic, RankSumStatistic, WelchStatistic,
    EXACT_U_MAX_SMALLER_SAMPLE,
};
pub use verdict::{
    compare_samples, mann_whitney_u, welch_t_test, Decision, Direction, TestKind, TestPair,
    TestResult,
};
