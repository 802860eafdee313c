//! Benchmark-against-best
//!
//! Expresses every group's statistics as an absolute and a percentage offset
//! from the best value in the result set. The best primary is the minimum or,
//! for metrics where higher is better, the maximum; the best secondary is
//! always the minimum. Both are found independently, so different groups may
//! lead each.

use crate::aggregate::{cmp_missing_last, Better, BenchmarkMetrics, GroupStatistics};
use crate::error::{AnalysisError, Result};
use crate::stats::round_to;
use serde::Serialize;

/// A group's standing relative to the best group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRow {
    pub subject_id: String,
    pub count: usize,
    /// Primary statistic (median or mean)
    pub primary: f64,
    pub offset_from_best: f64,
    pub percent_off_best: f64,
    /// Secondary statistic (MAD or standard deviation), absent for std-dev of one value
    pub secondary: Option<f64>,
    pub secondary_offset: Option<f64>,
    pub secondary_percent_off: Option<f64>,
}

/// Benchmark rows plus the reference values they were measured against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkTable {
    pub metrics: BenchmarkMetrics,
    pub best_primary: f64,
    pub best_secondary: Option<f64>,
    pub rows: Vec<BenchmarkRow>,
}

impl BenchmarkTable {
    /// Best performer on the primary statistic
    ///
    /// When several rows sit at zero offset the first by subject id wins.
    pub fn leader(&self) -> Option<&BenchmarkRow> {
        self.rows
            .iter()
            .filter(|row| row.offset_from_best == 0.0)
            .min_by(|a, b| a.subject_id.cmp(&b.subject_id))
    }

    /// Best performer on the secondary statistic, same tie-break as [`Self::leader`]
    pub fn secondary_leader(&self) -> Option<&BenchmarkRow> {
        self.rows
            .iter()
            .filter(|row| row.secondary_offset == Some(0.0))
            .min_by(|a, b| a.subject_id.cmp(&b.subject_id))
    }

    pub fn row(&self, subject_id: &str) -> Option<&BenchmarkRow> {
        self.rows.iter().find(|row| row.subject_id == subject_id)
    }

    /// Number of rows tied for the primary lead
    pub fn leader_ties(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.offset_from_best == 0.0)
            .count()
    }
}

/// Distance of `value` from `best` on the worse side, and as a percentage
///
/// The percentage uses `|best|` as denominator so negative location
/// statistics (grid deltas) still rank worst-last.
fn offset_and_percent(
    value: f64,
    best: f64,
    better: Better,
    precision: u32,
    percent_precision: u32,
) -> (f64, f64) {
    let offset = match better {
        Better::Lower => value - best,
        Better::Higher => best - value,
    };
    let percent = offset / best.abs() * 100.0;
    (
        round_to(offset, precision),
        round_to(percent, percent_precision),
    )
}

/// Compare every group against the best group
///
/// Fails with `EmptyResultSet` on empty input and `DegenerateBenchmark` when
/// a best value is zero, since the percentage offset is undefined there.
pub fn benchmark_against_best(
    rows: &[GroupStatistics],
    metrics: &BenchmarkMetrics,
    precision: u32,
    percent_precision: u32,
) -> Result<BenchmarkTable> {
    if rows.is_empty() {
        return Err(AnalysisError::EmptyResultSet(
            "no groups to benchmark; the filter matched no observations".to_string(),
        ));
    }

    let primaries = rows.iter().map(|row| metrics.primary_of(row));
    let best_primary = match metrics.better {
        Better::Lower => primaries.min_by(f64::total_cmp),
        Better::Higher => primaries.max_by(f64::total_cmp),
    }
    .ok_or_else(|| AnalysisError::EmptyResultSet("no primary statistic".to_string()))?;

    let best_secondary = rows
        .iter()
        .filter_map(|row| metrics.secondary_of(row))
        .min_by(f64::total_cmp);

    if best_primary == 0.0 {
        return Err(AnalysisError::DegenerateBenchmark {
            statistic: metrics.primary.to_string(),
        });
    }
    if best_secondary == Some(0.0) {
        return Err(AnalysisError::DegenerateBenchmark {
            statistic: metrics.secondary.to_string(),
        });
    }

    let mut out: Vec<BenchmarkRow> = rows
        .iter()
        .map(|row| {
            let primary = metrics.primary_of(row);
            let (offset_from_best, percent_off_best) = offset_and_percent(
                primary,
                best_primary,
                metrics.better,
                precision,
                percent_precision,
            );

            let secondary = metrics.secondary_of(row);
            let secondary_pair = secondary.zip(best_secondary).map(|(value, best)| {
                offset_and_percent(value, best, Better::Lower, precision, percent_precision)
            });

            BenchmarkRow {
                subject_id: row.subject_id.clone(),
                count: row.count,
                primary,
                offset_from_best,
                percent_off_best,
                secondary,
                secondary_offset: secondary_pair.map(|(offset, _)| offset),
                secondary_percent_off: secondary_pair.map(|(_, percent)| percent),
            }
        })
        .collect();

    out.sort_by(|a, b| {
        a.percent_off_best
            .total_cmp(&b.percent_off_best)
            .then_with(|| cmp_missing_last(a.secondary_percent_off, b.secondary_percent_off))
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });

    let table = BenchmarkTable {
        metrics: *metrics,
        best_primary,
        best_secondary,
        rows: out,
    };

    if let Some(leader) = table.leader() {
        tracing::info!(
            leader = %leader.subject_id,
            best = best_primary,
            "best {} in result set",
            metrics.primary
        );
    }
    if table.leader_ties() > 1 {
        tracing::warn!(
            ties = table.leader_ties(),
            "several groups share the best {}; leader chosen by subject id",
            metrics.primary
        );
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Location, Spread};

    fn row(id: &str, count: usize, median: f64, mad: f64) -> GroupStatistics {
        GroupStatistics {
            subject_id: id.to_string(),
            count,
            mean: median,
            median,
            std_dev: None,
            mad,
        }
    }

    fn pit_rows() -> Vec<GroupStatistics> {
        vec![
            row("R", 2, 22.95, 0.05),
            row("W", 3, 23.7, 0.2),
            row("H", 3, 24.9, 0.1),
        ]
    }

    #[test]
    fn test_pit_stop_benchmark() {
        let table =
            benchmark_against_best(&pit_rows(), &BenchmarkMetrics::default(), 3, 2).unwrap();

        assert_eq!(table.best_primary, 22.95);
        assert_eq!(table.best_secondary, Some(0.05));
        let order: Vec<_> = table.rows.iter().map(|r| r.subject_id.as_str()).collect();
        assert_eq!(order, vec!["R", "W", "H"]);

        let w = table.row("W").unwrap();
        assert_eq!(w.offset_from_best, 0.75);
        assert_eq!(w.percent_off_best, 3.27);
        assert_eq!(w.secondary_percent_off, Some(300.0));

        let h = table.row("H").unwrap();
        assert_eq!(h.percent_off_best, 8.5);
        assert_eq!(h.secondary_percent_off, Some(100.0));

        assert_eq!(table.leader().unwrap().subject_id, "R");
        assert_eq!(table.secondary_leader().unwrap().subject_id, "R");
    }

    #[test]
    fn test_independent_minima() {
        let rows = vec![row("fast", 3, 20.0, 2.0), row("steady", 3, 21.0, 0.5)];
        let table = benchmark_against_best(&rows, &BenchmarkMetrics::default(), 3, 2).unwrap();
        assert_eq!(table.leader().unwrap().subject_id, "fast");
        assert_eq!(table.secondary_leader().unwrap().subject_id, "steady");
        assert_eq!(table.row("fast").unwrap().secondary_percent_off, Some(300.0));
    }

    #[test]
    fn test_empty_input() {
        let result = benchmark_against_best(&[], &BenchmarkMetrics::default(), 3, 2);
        assert!(matches!(result, Err(AnalysisError::EmptyResultSet(_))));
    }

    #[test]
    fn test_zero_best_is_degenerate() {
        let rows = vec![row("a", 2, 0.0, 1.0), row("b", 2, 1.0, 1.0)];
        let result = benchmark_against_best(&rows, &BenchmarkMetrics::default(), 3, 2);
        assert!(matches!(
            result,
            Err(AnalysisError::DegenerateBenchmark { ref statistic }) if statistic == "median"
        ));
    }

    #[test]
    fn test_zero_best_secondary_is_degenerate() {
        let rows = vec![row("a", 2, 10.0, 0.0), row("b", 2, 11.0, 1.0)];
        let result = benchmark_against_best(&rows, &BenchmarkMetrics::default(), 3, 2);
        assert!(matches!(
            result,
            Err(AnalysisError::DegenerateBenchmark { ref statistic }) if statistic == "mad"
        ));
    }

    #[test]
    fn test_tied_leaders_pick_first_by_id() {
        let rows = vec![row("zeta", 2, 5.0, 1.0), row("alpha", 2, 5.0, 1.0)];
        let table = benchmark_against_best(&rows, &BenchmarkMetrics::default(), 3, 2).unwrap();
        assert_eq!(table.leader_ties(), 2);
        assert_eq!(table.leader().unwrap().subject_id, "alpha");
        assert_eq!(table.rows[0].subject_id, "alpha");
    }

    #[test]
    fn test_missing_std_dev_has_no_secondary_offset() {
        let mut single = row("solo", 1, 12.0, 0.0);
        single.std_dev = None;
        let mut pair = row("pair", 2, 10.0, 1.0);
        pair.std_dev = Some(1.5);
        let metrics = BenchmarkMetrics::new(Location::Mean, Spread::StdDev);

        let table = benchmark_against_best(&[single, pair], &metrics, 3, 2).unwrap();
        let solo = table.row("solo").unwrap();
        assert_eq!(solo.secondary, None);
        assert_eq!(solo.secondary_percent_off, None);
        assert_eq!(solo.percent_off_best, 20.0);
    }

    #[test]
    fn test_higher_is_better_picks_maximum() {
        let metrics = BenchmarkMetrics::new(Location::Mean, Spread::Mad).higher_is_better();
        let rows = vec![row("williams", 2, -2.5, 0.5), row("renault", 2, 2.5, 0.5)];
        let table = benchmark_against_best(&rows, &metrics, 3, 2).unwrap();

        assert_eq!(table.best_primary, 2.5);
        assert_eq!(table.leader().unwrap().subject_id, "renault");
        let williams = table.row("williams").unwrap();
        assert_eq!(williams.offset_from_best, 5.0);
        assert_eq!(williams.percent_off_best, 200.0);
        assert_eq!(table.rows[0].subject_id, "renault");
    }

    #[test]
    fn test_single_observation_mad_is_not_a_best_spread() {
        let rows = vec![row("solo", 1, 22.8, 0.0), row("pair", 2, 23.0, 0.1)];
        let table = benchmark_against_best(&rows, &BenchmarkMetrics::default(), 3, 2).unwrap();

        assert_eq!(table.leader().unwrap().subject_id, "solo");
        assert_eq!(table.best_secondary, Some(0.1));
        assert_eq!(table.row("solo").unwrap().secondary, None);
        assert_eq!(table.row("pair").unwrap().secondary_offset, Some(0.0));
    }

    #[test]
    fn test_negative_best_ranks_worst_last() {
        let metrics = BenchmarkMetrics::new(Location::Mean, Spread::Mad);
        let rows = vec![row("gains", 5, -2.0, 1.0), row("loses", 5, 1.0, 1.0)];
        let table = benchmark_against_best(&rows, &metrics, 3, 2).unwrap();
        assert_eq!(table.rows[0].subject_id, "gains");
        assert_eq!(table.rows[1].percent_off_best, 150.0);
    }
}
