//! Filter-and-aggregate stage
//!
//! Produces one [`GroupStatistics`] row per group present after filtering.
//! Groups are subjects by default; any facet can be used as the key instead
//! (e.g. rookie vs experienced, power vs technical sectors).

use crate::config::AnalysisConfig;
use crate::dataset::{Dataset, Facet};
use crate::error::Result;
use crate::filter::{FilterSpec, FilteredView};
use crate::stats::Summary;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Central-tendency statistic used as the primary benchmark metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Mean,
    Median,
}

/// Dispersion statistic used as the secondary benchmark metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spread {
    StdDev,
    Mad,
}

/// Which end of the primary statistic counts as best
///
/// Durations and deficits are better when lower; places gained are better
/// when higher. Dispersion is always better when lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Better {
    #[default]
    Lower,
    Higher,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Location::Mean => "mean",
            Location::Median => "median",
        })
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Spread::StdDev => "std_dev",
            Spread::Mad => "mad",
        })
    }
}

/// Which statistics rank groups and drive the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub primary: Location,
    pub secondary: Spread,
    #[serde(default)]
    pub better: Better,
}

impl BenchmarkMetrics {
    pub fn new(primary: Location, secondary: Spread) -> Self {
        Self {
            primary,
            secondary,
            better: Better::Lower,
        }
    }

    /// Best primary value is the maximum instead of the minimum
    pub fn higher_is_better(mut self) -> Self {
        self.better = Better::Higher;
        self
    }

    pub fn primary_of(&self, row: &GroupStatistics) -> f64 {
        match self.primary {
            Location::Mean => row.mean,
            Location::Median => row.median,
        }
    }

    /// `None` for a single-observation group, whose spread is meaningless
    pub fn secondary_of(&self, row: &GroupStatistics) -> Option<f64> {
        match self.secondary {
            Spread::StdDev => row.std_dev,
            Spread::Mad if row.count < 2 => None,
            Spread::Mad => Some(row.mad),
        }
    }
}

impl Default for BenchmarkMetrics {
    fn default() -> Self {
        Self::new(Location::Median, Spread::Mad)
    }
}

/// What the aggregation groups by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupKey {
    #[default]
    Subject,
    Facet(Facet),
}

/// Options for [`aggregate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateOptions {
    /// Divisor applied before rounding (1000.0 turns ms into s)
    pub scale: f64,
    /// Decimal places kept in reported statistics
    pub precision: u32,
    pub metrics: BenchmarkMetrics,
    pub group_key: GroupKey,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            precision: 3,
            metrics: BenchmarkMetrics::default(),
            group_key: GroupKey::Subject,
        }
    }
}

impl AggregateOptions {
    pub fn new(metrics: BenchmarkMetrics) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    /// Take reporting precision from an analysis configuration
    pub fn from_config(config: &AnalysisConfig, metrics: BenchmarkMetrics) -> Self {
        Self {
            precision: config.precision,
            ..Self::new(metrics)
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn grouped_by(mut self, key: GroupKey) -> Self {
        self.group_key = key;
        self
    }
}

/// Per-group summary after filtering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStatistics {
    /// Subject identifier, or the facet value when grouping by facet
    pub subject_id: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Absent for single-observation groups
    pub std_dev: Option<f64>,
    pub mad: f64,
}

impl GroupStatistics {
    fn from_summary(subject_id: String, summary: Summary) -> Self {
        Self {
            subject_id,
            count: summary.count,
            mean: summary.mean,
            median: summary.median,
            std_dev: summary.std_dev,
            mad: summary.mad,
        }
    }
}

/// Filter a dataset and summarise each group
///
/// Rows are sorted ascending by the primary statistic, then the secondary
/// statistic (missing values last), then count, then group id.
pub fn aggregate(
    dataset: &Dataset,
    filter: &FilterSpec,
    options: &AggregateOptions,
) -> Result<Vec<GroupStatistics>> {
    if let GroupKey::Facet(facet) = options.group_key {
        dataset.require_facet(facet)?;
    }

    let view = filter.apply(dataset)?;
    if view.is_empty() {
        tracing::warn!("No observations matched filter ({})", filter);
    }

    Ok(aggregate_view(&view, options))
}

/// Summarise an already-filtered view
pub fn aggregate_view(view: &FilteredView<'_>, options: &AggregateOptions) -> Vec<GroupStatistics> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut unkeyed = 0usize;

    for obs in view.observations() {
        let key = match options.group_key {
            GroupKey::Subject => obs.subject_id.clone(),
            GroupKey::Facet(facet) => match obs.facet(facet) {
                Some(value) => value.to_string(),
                None => {
                    unkeyed += 1;
                    continue;
                }
            },
        };
        groups.entry(key).or_default().push(obs.value);
    }

    if unkeyed > 0 {
        tracing::info!(
            skipped = unkeyed,
            "observations without a value for the grouping facet"
        );
    }

    let mut rows: Vec<GroupStatistics> = groups
        .into_iter()
        .filter_map(|(key, values)| {
            let summary = Summary::of(&values)?
                .scaled(options.scale)
                .rounded(options.precision);
            tracing::debug!(
                group = %key,
                count = summary.count,
                median = summary.median,
                mad = summary.mad,
                "aggregated group"
            );
            Some(GroupStatistics::from_summary(key, summary))
        })
        .collect();

    sort_rows(&mut rows, &options.metrics);
    rows
}

fn sort_rows(rows: &mut [GroupStatistics], metrics: &BenchmarkMetrics) {
    rows.sort_by(|a, b| {
        metrics
            .primary_of(a)
            .total_cmp(&metrics.primary_of(b))
            .then_with(|| cmp_missing_last(metrics.secondary_of(a), metrics.secondary_of(b)))
            .then_with(|| a.count.cmp(&b.count))
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
}

pub(crate) fn cmp_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetSchema, Observation};

    fn synthetic() -> Dataset {
        let mut observations: Vec<Observation> = [10.0, 20.0, 30.0]
            .into_iter()
            .map(|v| Observation::new("A", v).with(Facet::Year, 2019))
            .collect();
        observations.push(Observation::new("B", 100.0).with(Facet::Year, 2019));
        Dataset::from_observations(
            DatasetSchema::new("subject", "value").with_facet(Facet::Year),
            observations,
        )
    }

    #[test]
    fn test_known_values() {
        let options = AggregateOptions::new(BenchmarkMetrics::new(Location::Mean, Spread::StdDev));
        let rows = aggregate(&synthetic(), &FilterSpec::all(), &options).unwrap();

        assert_eq!(rows.len(), 2);
        let a = &rows[0];
        assert_eq!(a.subject_id, "A");
        assert_eq!(a.count, 3);
        assert_eq!(a.mean, 20.0);
        assert_eq!(a.std_dev, Some(10.0));
        assert_eq!(a.median, 20.0);
        assert_eq!(a.mad, 10.0);

        let b = &rows[1];
        assert_eq!(b.count, 1);
        assert_eq!(b.mean, 100.0);
        assert_eq!(b.std_dev, None);
    }

    #[test]
    fn test_scale_and_precision() {
        let dataset = Dataset::from_observations(
            DatasetSchema::new("constructor_ref", "pit_duration_ms"),
            vec![
                Observation::new("williams", 23500.0),
                Observation::new("williams", 23760.0),
            ],
        );
        let options = AggregateOptions::default().with_scale(1000.0).with_precision(2);
        let rows = aggregate(&dataset, &FilterSpec::all(), &options).unwrap();
        assert_eq!(rows[0].median, 23.63);
    }

    #[test]
    fn test_zero_matches_is_empty() {
        let rows = aggregate(
            &synthetic(),
            &FilterSpec::all().year(2015),
            &AggregateOptions::default(),
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_sort_ties_by_secondary_then_count_then_id() {
        let dataset = Dataset::from_observations(
            DatasetSchema::new("subject", "value"),
            vec![
                Observation::new("c", 5.0),
                Observation::new("c", 5.0),
                Observation::new("b", 5.0),
                Observation::new("a", 5.0),
                Observation::new("d", 4.0),
                Observation::new("d", 6.0),
            ],
        );
        let rows = aggregate(&dataset, &FilterSpec::all(), &AggregateOptions::default()).unwrap();
        let order: Vec<_> = rows.iter().map(|r| r.subject_id.as_str()).collect();
        // all medians 5; c has mad 0, d mad 1, a and b a single value and no spread
        assert_eq!(order, vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_single_value_std_dev_sorts_last() {
        let dataset = Dataset::from_observations(
            DatasetSchema::new("subject", "value"),
            vec![
                Observation::new("solo", 5.0),
                Observation::new("pair", 4.0),
                Observation::new("pair", 6.0),
            ],
        );
        let options = AggregateOptions::new(BenchmarkMetrics::new(Location::Mean, Spread::StdDev));
        let rows = aggregate(&dataset, &FilterSpec::all(), &options).unwrap();
        assert_eq!(rows[0].subject_id, "pair");
        assert_eq!(rows[1].subject_id, "solo");
    }

    #[test]
    fn test_group_by_facet() {
        let dataset = Dataset::from_observations(
            DatasetSchema::new("driver_name", "laptime_std_ms").with_facet(Facet::Experience),
            vec![
                Observation::new("Russell", 900.0).with(Facet::Experience, "rookie"),
                Observation::new("Latifi", 1100.0).with(Facet::Experience, "rookie"),
                Observation::new("Massa", 700.0).with(Facet::Experience, "experienced"),
                Observation::new("Kubica", 800.0),
            ],
        );
        let options = AggregateOptions::default().grouped_by(GroupKey::Facet(Facet::Experience));
        let rows = aggregate(&dataset, &FilterSpec::all(), &options).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject_id, "experienced");
        assert_eq!(rows[1].subject_id, "rookie");
        assert_eq!(rows[1].count, 2);
        assert_eq!(rows[1].median, 1000.0);
    }

    #[test]
    fn test_group_by_missing_facet_is_schema_error() {
        let options = AggregateOptions::default().grouped_by(GroupKey::Facet(Facet::Circuit));
        assert!(aggregate(&synthetic(), &FilterSpec::all(), &options).is_err());
    }

    #[test]
    fn test_from_config_takes_precision() {
        let config = AnalysisConfig {
            precision: 1,
            ..AnalysisConfig::default()
        };
        let options = AggregateOptions::from_config(&config, BenchmarkMetrics::default());
        assert_eq!(options.precision, 1);
    }
}
