//! CSV export of pipeline rows
//!
//! Every structured row type serializes through `csv::Writer` with a header
//! row. Absent optional values become empty cells.

use crate::aggregate::GroupStatistics;
use crate::benchmark::BenchmarkTable;
use crate::correlation::Correlation;
use crate::error::Result;
use crate::hypothesis::{TestPair, TestResult};
use crate::sectors::SectorDeficit;
use serde::Serialize;
use std::io::Write;

/// Serialize `rows` as CSV into `writer`
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize `rows` as a CSV string
pub fn rows_to_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut buf = Vec::new();
    write_rows(&mut buf, rows)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn group_statistics_csv(rows: &[GroupStatistics]) -> Result<String> {
    rows_to_csv(rows)
}

pub fn benchmark_csv(table: &BenchmarkTable) -> Result<String> {
    rows_to_csv(&table.rows)
}

pub fn deficits_csv(deficits: &[SectorDeficit]) -> Result<String> {
    rows_to_csv(deficits)
}

pub fn test_pair_csv(pair: &TestPair) -> Result<String> {
    // csv cannot serialize nested structs, so the pair is written as two rows
    let rows: Vec<_> = [&pair.parametric, &pair.non_parametric]
        .into_iter()
        .map(|result| TestRow::new(pair, result))
        .collect();
    rows_to_csv(&rows)
}

/// One row per test, labelled with the compared groups
#[derive(Debug, Serialize)]
struct TestRow<'a> {
    group_a: &'a str,
    group_b: &'a str,
    small_sample: bool,
    test_kind: String,
    direction: String,
    statistic: f64,
    p_value: f64,
    two_tailed_p: Option<f64>,
    df: Option<f64>,
    alpha: f64,
    decision: String,
    n_a: usize,
    n_b: usize,
}

impl<'a> TestRow<'a> {
    fn new(pair: &'a TestPair, result: &TestResult) -> Self {
        Self {
            group_a: &pair.label_a,
            group_b: &pair.label_b,
            small_sample: pair.small_sample,
            test_kind: result.test_kind.to_string(),
            direction: result.direction.to_string(),
            statistic: result.statistic,
            p_value: result.p_value,
            two_tailed_p: result.two_tailed_p,
            df: result.df,
            alpha: result.alpha,
            decision: result.decision.to_string(),
            n_a: result.n_a,
            n_b: result.n_b,
        }
    }
}

pub fn correlation_csv(correlation: &Correlation) -> Result<String> {
    rows_to_csv(std::slice::from_ref(correlation))
}
