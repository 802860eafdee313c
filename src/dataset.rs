//! Typed observations built from a raw table
//!
//! A [`DatasetSchema`] names the subject column, the value column and the
//! facet columns. Rows with a missing or invalid value are excluded and
//! counted in [`ExclusionReport`]; they are never coerced to zero.

use crate::error::{AnalysisError, Result};
use crate::table::{parse_finite, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Categorical or boolean attribute used to filter and group observations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Year,
    Circuit,
    LongStop,
    ChaoticSession,
    Experience,
    SectorType,
    CircuitType,
    Sector,
}

/// Value type carried by a facet column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    Integer,
    Text,
    Flag,
}

impl Facet {
    pub const ALL: [Facet; 8] = [
        Facet::Year,
        Facet::Circuit,
        Facet::LongStop,
        Facet::ChaoticSession,
        Facet::Experience,
        Facet::SectorType,
        Facet::CircuitType,
        Facet::Sector,
    ];

    /// Column name used by the processed race-data exports
    pub fn default_column(self) -> &'static str {
        match self {
            Facet::Year => "gp_year",
            Facet::Circuit => "gp_name",
            Facet::LongStop => "long_stop_flag",
            Facet::ChaoticSession => "chaotic_race_flag",
            Facet::Experience => "rookie_or_experienced",
            Facet::SectorType => "sector_type",
            Facet::CircuitType => "circuit_type",
            Facet::Sector => "sector",
        }
    }

    pub fn kind(self) -> FacetKind {
        match self {
            Facet::Year | Facet::Sector => FacetKind::Integer,
            Facet::LongStop | Facet::ChaoticSession => FacetKind::Flag,
            Facet::Circuit | Facet::Experience | Facet::SectorType | Facet::CircuitType => {
                FacetKind::Text
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Facet::Year => "year",
            Facet::Circuit => "circuit",
            Facet::LongStop => "long_stop",
            Facet::ChaoticSession => "chaotic_session",
            Facet::Experience => "experience",
            Facet::SectorType => "sector_type",
            Facet::CircuitType => "circuit_type",
            Facet::Sector => "sector",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Facet {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Facet::ALL
            .into_iter()
            .find(|facet| facet.name() == normalized || facet.default_column() == normalized)
            .ok_or_else(|| {
                AnalysisError::InvalidFilter(format!(
                    "unknown facet '{}' (expected one of: {})",
                    s,
                    Facet::ALL.map(Facet::name).join(", ")
                ))
            })
    }
}

/// A single facet cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue {
    Int(i64),
    Text(String),
    Flag(bool),
}

impl FacetValue {
    /// Parse a non-blank cell for the given kind
    pub fn parse(kind: FacetKind, cell: &str) -> Option<Self> {
        let cell = cell.trim();
        match kind {
            FacetKind::Integer => cell
                .parse::<i64>()
                .ok()
                // pandas writes integer columns with missing values as floats
                .or_else(|| {
                    cell.parse::<f64>()
                        .ok()
                        .filter(|v| v.fract() == 0.0 && v.is_finite())
                        .map(|v| v as i64)
                })
                .map(FacetValue::Int),
            FacetKind::Flag => parse_flag(cell).map(FacetValue::Flag),
            FacetKind::Text => Some(FacetValue::Text(cell.to_string())),
        }
    }
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetValue::Int(v) => write!(f, "{}", v),
            FacetValue::Text(v) => f.write_str(v),
            FacetValue::Flag(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for FacetValue {
    fn from(value: i64) -> Self {
        FacetValue::Int(value)
    }
}

impl From<bool> for FacetValue {
    fn from(value: bool) -> Self {
        FacetValue::Flag(value)
    }
}

impl From<&str> for FacetValue {
    fn from(value: &str) -> Self {
        FacetValue::Text(value.to_string())
    }
}

impl From<String> for FacetValue {
    fn from(value: String) -> Self {
        FacetValue::Text(value)
    }
}

fn parse_flag(cell: &str) -> Option<bool> {
    match cell.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// One measured event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Constructor or driver reference
    pub subject_id: String,
    /// Duration, position delta or time delta (always finite)
    pub value: f64,
    pub facets: BTreeMap<Facet, FacetValue>,
}

impl Observation {
    pub fn new(subject_id: impl Into<String>, value: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            value,
            facets: BTreeMap::new(),
        }
    }

    /// Builder-style facet assignment
    pub fn with(mut self, facet: Facet, value: impl Into<FacetValue>) -> Self {
        self.facets.insert(facet, value.into());
        self
    }

    pub fn facet(&self, facet: Facet) -> Option<&FacetValue> {
        self.facets.get(&facet)
    }
}

/// Which values are admissible for the value column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueRule {
    /// Any finite number (position deltas can be negative)
    #[default]
    Finite,
    /// Strictly positive finite numbers (durations and lap times)
    Positive,
}

/// Column mapping from a table to observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub subject_column: String,
    pub value_column: String,
    pub facet_columns: BTreeMap<Facet, String>,
    pub value_rule: ValueRule,
}

impl DatasetSchema {
    pub fn new(subject_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            subject_column: subject_column.into(),
            value_column: value_column.into(),
            facet_columns: BTreeMap::new(),
            value_rule: ValueRule::Finite,
        }
    }

    /// Map a facet to its default column name
    pub fn with_facet(self, facet: Facet) -> Self {
        self.with_facet_column(facet, facet.default_column())
    }

    pub fn with_facet_column(mut self, facet: Facet, column: impl Into<String>) -> Self {
        self.facet_columns.insert(facet, column.into());
        self
    }

    pub fn with_value_rule(mut self, rule: ValueRule) -> Self {
        self.value_rule = rule;
        self
    }

    pub fn with_subject_column(mut self, column: impl Into<String>) -> Self {
        self.subject_column = column.into();
        self
    }

    pub fn with_value_column(mut self, column: impl Into<String>) -> Self {
        self.value_column = column.into();
        self
    }
}

/// Counts of rows left out of the dataset, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionReport {
    /// Value cell blank, unparseable or non-finite
    pub invalid_value: usize,
    /// Value not strictly positive under [`ValueRule::Positive`]
    pub non_positive_value: usize,
    /// Subject cell blank
    pub missing_subject: usize,
}

impl ExclusionReport {
    pub fn total(&self) -> usize {
        self.invalid_value + self.non_positive_value + self.missing_subject
    }
}

/// Immutable collection of observations read once from the input
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: DatasetSchema,
    observations: Vec<Observation>,
    exclusions: ExclusionReport,
}

impl Dataset {
    /// Build a dataset from already-typed observations
    pub fn from_observations(schema: DatasetSchema, observations: Vec<Observation>) -> Self {
        Self {
            schema,
            observations,
            exclusions: ExclusionReport::default(),
        }
    }

    /// Read and type a CSV file
    pub fn from_path(path: impl AsRef<Path>, schema: DatasetSchema) -> Result<Self> {
        let table = Table::from_path(path)?;
        Self::from_table(&table, schema)
    }

    /// Type the rows of a table according to the schema
    ///
    /// Every column the schema references must exist, otherwise the call fails
    /// with a Schema error before any row is read.
    pub fn from_table(table: &Table, schema: DatasetSchema) -> Result<Self> {
        let subject_idx = table.column_index(&schema.subject_column)?;
        let value_idx = table.column_index(&schema.value_column)?;
        let facet_idx = schema
            .facet_columns
            .iter()
            .map(|(facet, column)| Ok((*facet, table.column_index(column)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut observations = Vec::with_capacity(table.len());
        let mut exclusions = ExclusionReport::default();

        for (row_no, row) in table.rows().iter().enumerate() {
            let subject = row[subject_idx].trim();
            if subject.is_empty() {
                exclusions.missing_subject += 1;
                continue;
            }

            let Some(value) = parse_finite(&row[value_idx]) else {
                exclusions.invalid_value += 1;
                continue;
            };
            if schema.value_rule == ValueRule::Positive && value <= 0.0 {
                exclusions.non_positive_value += 1;
                continue;
            }

            let mut facets = BTreeMap::new();
            for (facet, idx) in &facet_idx {
                let cell = row[*idx].trim();
                if cell.is_empty() {
                    continue;
                }
                let parsed =
                    FacetValue::parse(facet.kind(), cell).ok_or_else(|| AnalysisError::Parse {
                        row: row_no + 1,
                        column: schema.facet_columns[facet].clone(),
                        value: cell.to_string(),
                        expected: match facet.kind() {
                            FacetKind::Integer => "integer",
                            FacetKind::Flag => "boolean",
                            FacetKind::Text => "text",
                        },
                    })?;
                facets.insert(*facet, parsed);
            }

            observations.push(Observation {
                subject_id: subject.to_string(),
                value,
                facets,
            });
        }

        if exclusions.total() > 0 {
            tracing::info!(
                invalid_value = exclusions.invalid_value,
                non_positive_value = exclusions.non_positive_value,
                missing_subject = exclusions.missing_subject,
                "excluded rows from '{}'",
                schema.value_column
            );
        }

        Ok(Self {
            schema,
            observations,
            exclusions,
        })
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn exclusions(&self) -> ExclusionReport {
        self.exclusions
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Whether the dataset carries a column for this facet
    pub fn has_facet(&self, facet: Facet) -> bool {
        self.schema.facet_columns.contains_key(&facet)
    }

    /// Schema error for a facet this dataset does not carry
    pub fn require_facet(&self, facet: Facet) -> Result<()> {
        if self.has_facet(facet) {
            return Ok(());
        }
        Err(AnalysisError::Schema {
            column: facet.default_column().to_string(),
            available: self
                .schema
                .facet_columns
                .values()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Copy of the dataset with `facet` computed from each observation
    ///
    /// Observations for which `derive` returns `None` carry no value for the
    /// facet. The source dataset is left untouched.
    pub fn derive_facet<F>(&self, facet: Facet, derive: F) -> Dataset
    where
        F: Fn(&Observation) -> Option<FacetValue>,
    {
        let observations = self
            .observations
            .iter()
            .map(|obs| {
                let mut obs = obs.clone();
                match derive(&obs) {
                    Some(value) => {
                        obs.facets.insert(facet, value);
                    }
                    None => {
                        obs.facets.remove(&facet);
                    }
                }
                obs
            })
            .collect();

        let schema = self
            .schema
            .clone()
            .with_facet_column(facet, facet.default_column());

        Dataset {
            schema,
            observations,
            exclusions: self.exclusions,
        }
    }

    /// Distinct subject identifiers in natural (lexicographic) order
    pub fn subjects(&self) -> BTreeSet<&str> {
        self.observations
            .iter()
            .map(|obs| obs.subject_id.as_str())
            .collect()
    }
}
