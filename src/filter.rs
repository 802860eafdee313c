//! Facet filtering for the aggregation stage
//!
//! A [`FilterSpec`] holds one explicit constraint per supported facet. A facet
//! left at [`Constraint::Any`] matches every observation; a constrained facet
//! matches observations whose value is in the accepted set. Constraints are
//! combined conjunctively.
//!
//! Expressions accepted by [`FilterSpec::from_exprs`]:
//! - Single value: `year=2019`, `long_stop=false`
//! - Value list: `circuit=Monaco Grand Prix,Singapore Grand Prix`
//! - Inclusive integer range: `year=2015..2019` (at most [`MAX_RANGE_SPAN`] values)

use crate::dataset::{Dataset, Facet, FacetKind, FacetValue, Observation};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Either unconstrained or a non-empty set of accepted values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint<T: Ord> {
    Any,
    OneOf(BTreeSet<T>),
}

impl<T: Ord> Default for Constraint<T> {
    fn default() -> Self {
        Constraint::Any
    }
}

impl<T: Ord + Clone> Constraint<T> {
    pub fn one(value: T) -> Self {
        Constraint::OneOf(BTreeSet::from([value]))
    }

    pub fn one_of(values: impl IntoIterator<Item = T>) -> Self {
        Constraint::OneOf(values.into_iter().collect())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Constraint::Any)
    }

    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::OneOf(set) => set.contains(value),
        }
    }

    fn to_facet_values(&self) -> Option<BTreeSet<FacetValue>>
    where
        T: Into<FacetValue>,
    {
        match self {
            Constraint::Any => None,
            Constraint::OneOf(set) => Some(set.iter().cloned().map(Into::into).collect()),
        }
    }
}

/// Conjunction of facet constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub year: Constraint<i64>,
    pub circuit: Constraint<String>,
    pub long_stop: Constraint<bool>,
    pub chaotic_session: Constraint<bool>,
    pub experience: Constraint<String>,
    pub sector_type: Constraint<String>,
    pub circuit_type: Constraint<String>,
    pub sector: Constraint<i64>,
    /// Restricts the subject identifiers (e.g. the midfield constructors)
    pub subjects: Constraint<String>,
}

impl FilterSpec {
    /// Create a filter that matches all observations
    pub fn all() -> Self {
        Self::default()
    }

    pub fn year(mut self, year: i64) -> Self {
        self.year = Constraint::one(year);
        self
    }

    pub fn years(mut self, years: impl IntoIterator<Item = i64>) -> Self {
        self.year = Constraint::one_of(years);
        self
    }

    pub fn circuits<S: Into<String>>(mut self, circuits: impl IntoIterator<Item = S>) -> Self {
        self.circuit = Constraint::one_of(circuits.into_iter().map(Into::into));
        self
    }

    pub fn long_stop(mut self, flag: bool) -> Self {
        self.long_stop = Constraint::one(flag);
        self
    }

    pub fn chaotic_session(mut self, flag: bool) -> Self {
        self.chaotic_session = Constraint::one(flag);
        self
    }

    pub fn experience(mut self, level: impl Into<String>) -> Self {
        self.experience = Constraint::one(level.into());
        self
    }

    pub fn sector_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.sector_type = Constraint::one_of(types.into_iter().map(Into::into));
        self
    }

    pub fn circuit_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.circuit_type = Constraint::one_of(types.into_iter().map(Into::into));
        self
    }

    pub fn sectors(mut self, sectors: impl IntoIterator<Item = i64>) -> Self {
        self.sector = Constraint::one_of(sectors);
        self
    }

    pub fn subjects<S: Into<String>>(mut self, subjects: impl IntoIterator<Item = S>) -> Self {
        self.subjects = Constraint::one_of(subjects.into_iter().map(Into::into));
        self
    }

    /// Parse `facet=values` expressions and combine them
    pub fn from_exprs<S: AsRef<str>>(exprs: &[S]) -> Result<Self> {
        exprs
            .iter()
            .try_fold(Self::all(), |spec, expr| spec.with_expr(expr.as_ref()))
    }

    /// Add one `facet=values` expression to this filter
    pub fn with_expr(self, expr: &str) -> Result<Self> {
        let Some((name, spec)) = expr.split_once('=') else {
            return Err(AnalysisError::InvalidFilter(format!(
                "invalid filter expression: {}. Expected format: FACET=VALUE[,VALUE...]",
                expr
            )));
        };

        let name = name.trim();
        if name == "subject" || name == "subjects" {
            let values = spec.split(',').map(str::trim).filter(|s| !s.is_empty());
            return Ok(self.subjects(values));
        }

        let facet: Facet = name.parse()?;
        let values = parse_values(facet, spec)?;
        self.with_constraint(facet, values)
    }

    /// Set a facet's accepted values from untyped facet values
    pub fn with_constraint(mut self, facet: Facet, values: BTreeSet<FacetValue>) -> Result<Self> {
        let mismatch = || {
            AnalysisError::InvalidFilter(format!("value of wrong type for facet '{}'", facet))
        };

        fn collect<T: Ord>(
            values: &BTreeSet<FacetValue>,
            pick: impl Fn(&FacetValue) -> Option<T>,
        ) -> Option<BTreeSet<T>> {
            values.iter().map(pick).collect()
        }
        let ints = || {
            collect(&values, |v| match v {
                FacetValue::Int(i) => Some(*i),
                _ => None,
            })
            .ok_or_else(mismatch)
        };
        let texts = || {
            collect(&values, |v| match v {
                FacetValue::Text(s) => Some(s.clone()),
                _ => None,
            })
            .ok_or_else(mismatch)
        };
        let flags = || {
            collect(&values, |v| match v {
                FacetValue::Flag(b) => Some(*b),
                _ => None,
            })
            .ok_or_else(mismatch)
        };

        match facet {
            Facet::Year => self.year = Constraint::OneOf(ints()?),
            Facet::Sector => self.sector = Constraint::OneOf(ints()?),
            Facet::Circuit => self.circuit = Constraint::OneOf(texts()?),
            Facet::Experience => self.experience = Constraint::OneOf(texts()?),
            Facet::SectorType => self.sector_type = Constraint::OneOf(texts()?),
            Facet::CircuitType => self.circuit_type = Constraint::OneOf(texts()?),
            Facet::LongStop => self.long_stop = Constraint::OneOf(flags()?),
            Facet::ChaoticSession => self.chaotic_session = Constraint::OneOf(flags()?),
        }
        Ok(self)
    }

    /// Constrained facets with their accepted values
    pub fn facet_constraints(&self) -> Vec<(Facet, BTreeSet<FacetValue>)> {
        [
            (Facet::Year, self.year.to_facet_values()),
            (Facet::Circuit, self.circuit.to_facet_values()),
            (Facet::LongStop, self.long_stop.to_facet_values()),
            (Facet::ChaoticSession, self.chaotic_session.to_facet_values()),
            (Facet::Experience, self.experience.to_facet_values()),
            (Facet::SectorType, self.sector_type.to_facet_values()),
            (Facet::CircuitType, self.circuit_type.to_facet_values()),
            (Facet::Sector, self.sector.to_facet_values()),
        ]
        .into_iter()
        .filter_map(|(facet, values)| values.map(|values| (facet, values)))
        .collect()
    }

    /// True when no facet and no subject is constrained
    pub fn is_unconstrained(&self) -> bool {
        self.subjects.is_any() && self.facet_constraints().is_empty()
    }

    /// Reject constraints with an empty accepted set
    pub fn validate(&self) -> Result<()> {
        if let Constraint::OneOf(set) = &self.subjects {
            if set.is_empty() {
                return Err(AnalysisError::InvalidFilter(
                    "subject constraint has no accepted values".to_string(),
                ));
            }
        }
        for (facet, values) in self.facet_constraints() {
            if values.is_empty() {
                return Err(AnalysisError::InvalidFilter(format!(
                    "constraint on '{}' has no accepted values",
                    facet
                )));
            }
        }
        Ok(())
    }

    /// Check if an observation satisfies every constraint
    pub fn matches(&self, observation: &Observation) -> bool {
        self.subjects.accepts(&observation.subject_id)
            && self
                .facet_constraints()
                .iter()
                .all(|(facet, accepted)| {
                    observation
                        .facet(*facet)
                        .is_some_and(|value| accepted.contains(value))
                })
    }

    /// Apply the filter to a dataset
    ///
    /// Fails with a Schema error when a constrained facet has no column in the
    /// dataset. A filter matching nothing yields an empty view, not an error.
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> Result<FilteredView<'a>> {
        self.validate()?;

        let constraints = self.facet_constraints();
        for (facet, _) in &constraints {
            dataset.require_facet(*facet)?;
        }

        for line in self.describe() {
            tracing::info!("Filtering data for {}", line);
        }

        let observations: Vec<&Observation> = dataset
            .observations()
            .iter()
            .filter(|obs| {
                self.subjects.accepts(&obs.subject_id)
                    && constraints.iter().all(|(facet, accepted)| {
                        obs.facet(*facet).is_some_and(|value| accepted.contains(value))
                    })
            })
            .collect();

        tracing::debug!(
            matched = observations.len(),
            total = dataset.len(),
            "filter applied"
        );

        Ok(FilteredView {
            observations,
            total: dataset.len(),
        })
    }

    /// Human-readable description of each applied constraint
    pub fn describe(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .facet_constraints()
            .into_iter()
            .map(|(facet, values)| format!("{}: {}", facet, join_values(&values)))
            .collect();
        if let Constraint::OneOf(subjects) = &self.subjects {
            lines.push(format!(
                "subjects: {}",
                subjects.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        lines
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.describe();
        if lines.is_empty() {
            f.write_str("all data")
        } else {
            f.write_str(&lines.join("; "))
        }
    }
}

fn join_values(values: &BTreeSet<FacetValue>) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Widest `a..b` range accepted in a filter expression
pub const MAX_RANGE_SPAN: i64 = 1000;

/// Parse the value list of a filter expression for a facet
fn parse_values(facet: Facet, spec: &str) -> Result<BTreeSet<FacetValue>> {
    let mut values = BTreeSet::new();

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if facet.kind() == FacetKind::Integer {
            if let Some((start, end)) = part.split_once("..") {
                let (Ok(start), Ok(end)) = (start.trim().parse::<i64>(), end.trim().parse::<i64>())
                else {
                    return Err(AnalysisError::InvalidFilter(format!(
                        "invalid range '{}' for facet '{}'",
                        part, facet
                    )));
                };
                match end.checked_sub(start) {
                    Some(span) if (0..MAX_RANGE_SPAN).contains(&span) => {
                        values.extend((start..=end).map(FacetValue::Int));
                    }
                    _ => {
                        return Err(AnalysisError::InvalidFilter(format!(
                            "range '{}' for facet '{}' must ascend and cover at most {} values",
                            part, facet, MAX_RANGE_SPAN
                        )));
                    }
                }
                continue;
            }
        }

        let value = FacetValue::parse(facet.kind(), part).ok_or_else(|| {
            AnalysisError::InvalidFilter(format!("invalid value '{}' for facet '{}'", part, facet))
        })?;
        values.insert(value);
    }

    if values.is_empty() {
        return Err(AnalysisError::InvalidFilter(format!(
            "no values given for facet '{}'",
            facet
        )));
    }
    Ok(values)
}

/// Read-only view of the observations that passed a filter
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    observations: Vec<&'a Observation>,
    total: usize,
}

impl<'a> FilteredView<'a> {
    pub fn observations(&self) -> &[&'a Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations removed by the filter's constraints
    pub fn filtered_out(&self) -> usize {
        self.total - self.observations.len()
    }

    /// Values of the observations belonging to one subject
    pub fn values_for(&self, subject_id: &str) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|obs| obs.subject_id == subject_id)
            .map(|obs| obs.value)
            .collect()
    }

    /// Values of the observations whose subject is in the given set
    pub fn values_for_any(&self, subjects: &BTreeSet<String>) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|obs| subjects.contains(&obs.subject_id))
            .map(|obs| obs.value)
            .collect()
    }

    /// Values of the observations carrying a given facet value
    pub fn values_where(&self, facet: Facet, value: &FacetValue) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|obs| obs.facet(facet) == Some(value))
            .map(|obs| obs.value)
            .collect()
    }
}
