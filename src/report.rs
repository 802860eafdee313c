//! Human-readable rendering of pipeline output
//!
//! Every function returns a `String`; the binary decides where it goes.

use crate::aggregate::{BenchmarkMetrics, GroupStatistics};
use crate::benchmark::BenchmarkTable;
use crate::correlation::Correlation;
use crate::dataset::ExclusionReport;
use crate::sectors::SectorDeficit;
use serde::Serialize;
use std::fmt;
use std::fmt::Write as _;

/// Format milliseconds as `mm:ss.mmm`
///
/// ```
/// use pitwall::report::format_lap_time;
///
/// assert_eq!(format_lap_time(83_456.0), "01:23.456");
/// ```
pub fn format_lap_time(ms: f64) -> String {
    if !ms.is_finite() {
        return "--:--.---".to_string();
    }
    let sign = if ms < 0.0 { "-" } else { "" };
    let total = ms.abs().round() as u64;
    format!(
        "{}{:02}:{:02}.{:03}",
        sign,
        total / 60_000,
        (total % 60_000) / 1000,
        total % 1000
    )
}

/// What happened to a car between the grid and the flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GridMovement {
    Gained,
    Lost,
    Held,
}

impl fmt::Display for GridMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GridMovement::Gained => "gained",
            GridMovement::Lost => "lost",
            GridMovement::Held => "held",
        })
    }
}

/// Classify a grid-to-finish delta (grid minus finish; positive means places gained)
pub fn classify_grid_delta(delta: f64) -> GridMovement {
    if delta > 0.0 {
        GridMovement::Gained
    } else if delta < 0.0 {
        GridMovement::Lost
    } else {
        GridMovement::Held
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}

/// Table of per-group statistics
pub fn format_group_table(rows: &[GroupStatistics], unit: &str, decimals: u32) -> String {
    if rows.is_empty() {
        return "No observations matched the filter.\n".to_string();
    }
    let d = decimals as usize;
    let width = rows
        .iter()
        .map(|r| r.subject_id.len())
        .max()
        .unwrap_or(0)
        .max("group".len());

    let mut out = String::new();
    let _ = writeln!(out, "Statistics ({})", unit);
    let _ = writeln!(
        out,
        "{:<width$} {:>6} {:>12} {:>12} {:>12} {:>12}",
        "group", "count", "mean", "median", "std_dev", "mad"
    );
    let _ = writeln!(out, "{}", "-".repeat(width + 58));
    for row in rows {
        let _ = writeln!(
            out,
            "{:<width$} {:>6} {:>12.d$} {:>12.d$} {:>12} {:>12.d$}",
            row.subject_id,
            row.count,
            row.mean,
            row.median,
            fmt_opt(row.std_dev, d),
            row.mad,
        );
    }
    out
}

/// Table of benchmark offsets with the best values in the header
pub fn format_benchmark_table(table: &BenchmarkTable, unit: &str, decimals: u32) -> String {
    let d = decimals as usize;
    let BenchmarkMetrics {
        primary, secondary, ..
    } = table.metrics;
    let width = table
        .rows
        .iter()
        .map(|r| r.subject_id.len())
        .max()
        .unwrap_or(0)
        .max("group".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Benchmark against best {} = {:.d$} {}, best {} = {} {}",
        primary,
        table.best_primary,
        unit,
        secondary,
        fmt_opt(table.best_secondary, d),
        unit
    );
    let _ = writeln!(
        out,
        "{:<width$} {:>6} {:>10} {:>10} {:>9} {:>10} {:>10} {:>9}",
        "group",
        "count",
        primary.to_string(),
        "offset",
        "% off",
        secondary.to_string(),
        "offset",
        "% off"
    );
    let _ = writeln!(out, "{}", "-".repeat(width + 82));
    for row in &table.rows {
        let _ = writeln!(
            out,
            "{:<width$} {:>6} {:>10.d$} {:>10.d$} {:>9.2} {:>10} {:>10} {:>9}",
            row.subject_id,
            row.count,
            row.primary,
            row.offset_from_best,
            row.percent_off_best,
            fmt_opt(row.secondary, d),
            fmt_opt(row.secondary_offset, d),
            fmt_opt(row.secondary_percent_off, 2),
        );
    }
    if let Some(leader) = table.leader() {
        let _ = writeln!(out, "\n🏁 Best {}: {}", primary, leader.subject_id);
    }
    if let Some(leader) = table.secondary_leader() {
        let _ = writeln!(out, "🏁 Best {}: {}", secondary, leader.subject_id);
    }
    out
}

pub fn format_correlation(correlation: &Correlation, alpha: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Pearson correlation coefficient (r): {:.3}", correlation.r);
    let _ = writeln!(out, "P-value: {:.4}", correlation.p_value);
    let _ = writeln!(out, "Pairs: {}", correlation.n);
    let _ = writeln!(out, "Strength: {}", correlation.strength);
    if correlation.is_significant(alpha) {
        let _ = writeln!(out, "✅ Statistically significant at alpha = {}", alpha);
    } else {
        let _ = writeln!(out, "Not significant at alpha = {}", alpha);
    }
    out
}

/// One line per session segment
pub fn format_deficits(deficits: &[SectorDeficit]) -> String {
    if deficits.is_empty() {
        return "No sessions with target lap data.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<26} {:<4} {:>9} {:>9} {:>8} {:>8}  {:<14} {:<10} {:<10}",
        "year", "circuit", "seg", "target", "best", "delta", "% slow", "fastest", "sector", "circuit"
    );
    let _ = writeln!(out, "{}", "-".repeat(112));
    for d in deficits {
        let _ = writeln!(
            out,
            "{:<6} {:<26} {:<4} {:>9.3} {:>9.3} {:>8.3} {:>8.3}  {:<14} {:<10} {:<10}",
            d.year,
            d.circuit,
            d.segment.to_string(),
            d.target_time,
            d.field_best_time,
            d.delta,
            d.pct_slower,
            d.fastest_team,
            d.sector_type.map(|c| c.as_str()).unwrap_or("-"),
            d.circuit_type.map(|c| c.as_str()).unwrap_or("-"),
        );
    }
    out
}

/// Summary of rows dropped while loading, empty when nothing was dropped
pub fn format_exclusions(report: &ExclusionReport) -> String {
    if report.total() == 0 {
        return String::new();
    }
    format!(
        "Excluded {} row(s): {} invalid value, {} non-positive value, {} missing subject\n",
        report.total(),
        report.invalid_value,
        report.non_positive_value,
        report.missing_subject
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::BenchmarkMetrics;
    use crate::benchmark::benchmark_against_best;
    use crate::correlation::pearson;

    fn rows() -> Vec<GroupStatistics> {
        vec![
            GroupStatistics {
                subject_id: "renault".to_string(),
                count: 2,
                mean: 22.95,
                median: 22.95,
                std_dev: Some(0.071),
                mad: 0.05,
            },
            GroupStatistics {
                subject_id: "williams".to_string(),
                count: 1,
                mean: 23.7,
                median: 23.7,
                std_dev: None,
                mad: 0.2,
            },
        ]
    }

    #[test]
    fn test_format_lap_time() {
        assert_eq!(format_lap_time(83_456.0), "01:23.456");
        assert_eq!(format_lap_time(59_999.6), "01:00.000");
        assert_eq!(format_lap_time(1_234.0), "00:01.234");
        assert_eq!(format_lap_time(-1_500.0), "-00:01.500");
        assert_eq!(format_lap_time(f64::NAN), "--:--.---");
    }

    #[test]
    fn test_classify_grid_delta() {
        assert_eq!(classify_grid_delta(3.0), GridMovement::Gained);
        assert_eq!(classify_grid_delta(-7.0), GridMovement::Lost);
        assert_eq!(classify_grid_delta(0.0), GridMovement::Held);
        assert_eq!(GridMovement::Lost.to_string(), "lost");
    }

    #[test]
    fn test_group_table() {
        let text = format_group_table(&rows(), "s", 3);
        assert!(text.contains("Statistics (s)"));
        assert!(text.contains("renault"));
        assert!(text.contains("22.950"));
        // single-observation std_dev renders as a dash
        let williams = text.lines().find(|l| l.starts_with("williams")).unwrap();
        assert!(williams.contains(" - "));
    }

    #[test]
    fn test_empty_group_table() {
        assert!(format_group_table(&[], "s", 3).contains("No observations"));
    }

    #[test]
    fn test_benchmark_table() {
        let table = benchmark_against_best(&rows(), &BenchmarkMetrics::default(), 3, 2).unwrap();
        let text = format_benchmark_table(&table, "s", 3);
        assert!(text.contains("best median = 22.950 s"));
        assert!(text.contains("3.27"));
        assert!(text.contains("Best median: renault"));
    }

    #[test]
    fn test_correlation_report() {
        let c = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 1.0, 4.0, 3.0, 5.0]).unwrap();
        let text = format_correlation(&c, 0.05);
        assert!(text.contains("0.800"));
        assert!(text.contains("very strong"));
        assert!(text.contains("Not significant"));
    }

    #[test]
    fn test_exclusions() {
        assert_eq!(format_exclusions(&ExclusionReport::default()), "");
        let report = ExclusionReport {
            invalid_value: 2,
            non_positive_value: 1,
            missing_subject: 0,
        };
        assert!(format_exclusions(&report).starts_with("Excluded 3 row(s)"));
    }
}
