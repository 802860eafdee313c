//! Qualifying sector deficits
//!
//! For each qualifying session (year, circuit) the target team's best sector
//! and lap times are compared with the best times set by anyone in the field.
//! Each deficit row is labelled with the sector's and circuit's character so
//! it can be aggregated and tested like any other observation.

use crate::dataset::{Dataset, DatasetSchema, Facet, FacetKind, FacetValue, Observation};
use crate::error::{AnalysisError, Result};
use crate::kpi::{circuit_type, sector_type, Kpi, TrackCharacter};
use crate::stats::round_to;
use crate::table::Table;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Column names of a per-lap qualifying export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LapSchema {
    pub year: String,
    pub circuit: String,
    pub driver: String,
    pub team: String,
    pub lap_time: String,
    pub sector_times: [String; 3],
    pub personal_best: String,
    pub accurate: String,
}

impl Default for LapSchema {
    fn default() -> Self {
        Self {
            year: "Year".to_string(),
            circuit: "Race".to_string(),
            driver: "Driver".to_string(),
            team: "Team".to_string(),
            lap_time: "LapTime".to_string(),
            sector_times: [
                "Sector1Time".to_string(),
                "Sector2Time".to_string(),
                "Sector3Time".to_string(),
            ],
            personal_best: "IsPersonalBest".to_string(),
            accurate: "IsAccurate".to_string(),
        }
    }
}

/// One personal-best, accurate qualifying lap (times in seconds)
#[derive(Debug, Clone, PartialEq)]
pub struct QualifyingLap {
    pub year: i64,
    pub circuit: String,
    pub driver: String,
    pub team: String,
    pub lap_time: Option<f64>,
    pub sector_times: [Option<f64>; 3],
}

impl QualifyingLap {
    fn time(&self, segment: Segment) -> Option<f64> {
        match segment {
            Segment::Sector(n) => self.sector_times[usize::from(n - 1)],
            Segment::Lap => self.lap_time,
        }
    }
}

/// Laps kept after screening, with counts of what was left out
#[derive(Debug, Clone, Default)]
pub struct LapSet {
    pub laps: Vec<QualifyingLap>,
    pub not_personal_best: usize,
    pub inaccurate: usize,
    pub outside_field: usize,
}

/// Parse a lap or sector time into seconds
///
/// Accepts plain seconds (`80.123`), clock times (`1:20.123`,
/// `00:01:20.123000`) and pandas timedeltas (`0 days 00:01:20.123000`).
/// Blank cells, `NaT` and non-positive times give `None`.
pub fn parse_time_seconds(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nat") {
        return None;
    }

    let (days, clock) = match cell.split_once("days") {
        Some((days, rest)) => (days.trim().parse::<f64>().ok()?, rest.trim()),
        None => match cell.split_once("day") {
            Some((days, rest)) => (days.trim().parse::<f64>().ok()?, rest.trim()),
            None => (0.0, cell),
        },
    };

    let mut seconds = 0.0;
    for part in clock.split(':') {
        seconds = seconds * 60.0 + part.trim().parse::<f64>().ok()?;
    }
    let total = days * 86_400.0 + seconds;
    (total.is_finite() && total > 0.0).then_some(total)
}

/// Read laps from a table, keeping personal-best accurate laps of the field
///
/// An empty `field` keeps every team.
pub fn load_laps(table: &Table, schema: &LapSchema, field: &BTreeSet<String>) -> Result<LapSet> {
    let year_idx = table.column_index(&schema.year)?;
    let circuit_idx = table.column_index(&schema.circuit)?;
    let driver_idx = table.column_index(&schema.driver)?;
    let team_idx = table.column_index(&schema.team)?;
    let lap_idx = table.column_index(&schema.lap_time)?;
    let sector_idx = [
        table.column_index(&schema.sector_times[0])?,
        table.column_index(&schema.sector_times[1])?,
        table.column_index(&schema.sector_times[2])?,
    ];
    let pb_idx = table.column_index(&schema.personal_best)?;
    let accurate_idx = table.column_index(&schema.accurate)?;

    let flag = |row_no: usize, column: &str, cell: &str| -> Result<bool> {
        match FacetValue::parse(FacetKind::Flag, cell) {
            Some(FacetValue::Flag(value)) => Ok(value),
            // a blank flag counts as not set
            _ if cell.trim().is_empty() => Ok(false),
            _ => Err(AnalysisError::Parse {
                row: row_no + 1,
                column: column.to_string(),
                value: cell.to_string(),
                expected: "boolean",
            }),
        }
    };

    let mut set = LapSet::default();
    for (row_no, row) in table.rows().iter().enumerate() {
        let team = row[team_idx].trim();
        if !field.is_empty() && !field.contains(team) {
            set.outside_field += 1;
            continue;
        }
        if !flag(row_no, &schema.personal_best, &row[pb_idx])? {
            set.not_personal_best += 1;
            continue;
        }
        if !flag(row_no, &schema.accurate, &row[accurate_idx])? {
            set.inaccurate += 1;
            continue;
        }

        let year = match FacetValue::parse(FacetKind::Integer, &row[year_idx]) {
            Some(FacetValue::Int(year)) => year,
            _ => {
                return Err(AnalysisError::Parse {
                    row: row_no + 1,
                    column: schema.year.clone(),
                    value: row[year_idx].clone(),
                    expected: "integer",
                })
            }
        };

        set.laps.push(QualifyingLap {
            year,
            circuit: row[circuit_idx].trim().to_string(),
            driver: row[driver_idx].trim().to_string(),
            team: team.to_string(),
            lap_time: parse_time_seconds(&row[lap_idx]),
            sector_times: sector_idx.map(|idx| parse_time_seconds(&row[idx])),
        });
    }

    tracing::info!(
        kept = set.laps.len(),
        not_personal_best = set.not_personal_best,
        inaccurate = set.inaccurate,
        outside_field = set.outside_field,
        "loaded qualifying laps"
    );
    Ok(set)
}

/// A qualifying session
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Session {
    pub year: i64,
    pub circuit: String,
}

impl Session {
    pub fn new(year: i64, circuit: impl Into<String>) -> Self {
        Self {
            year,
            circuit: circuit.into(),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.circuit)
    }
}

/// Distinct sessions present in a set of laps, in (year, circuit) order
pub fn sessions_in(laps: &[QualifyingLap]) -> Vec<Session> {
    laps.iter()
        .map(|lap| Session::new(lap.year, lap.circuit.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Timed part of a lap
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Sector 1-3
    Sector(u8),
    Lap,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::Sector(1),
        Segment::Sector(2),
        Segment::Sector(3),
        Segment::Lap,
    ];

    pub fn sector_number(self) -> Option<u8> {
        match self {
            Segment::Sector(n) => Some(n),
            Segment::Lap => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Sector(n) => write!(f, "S{}", n),
            Segment::Lap => f.write_str("Lap"),
        }
    }
}

impl Serialize for Segment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The target's best time in one segment of one session versus the field's best
///
/// Serialized column names match the sector-delta KPI schema so an export can
/// be fed straight back into the aggregation and test stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorDeficit {
    #[serde(rename = "gp_year")]
    pub year: i64,
    #[serde(rename = "gp_name")]
    pub circuit: String,
    pub segment: Segment,
    /// Sector number, absent for the full lap
    pub sector: Option<u8>,
    pub team: String,
    #[serde(rename = "target_time_s")]
    pub target_time: f64,
    #[serde(rename = "field_best_s")]
    pub field_best_time: f64,
    pub fastest_team: String,
    #[serde(rename = "sector_delta_s")]
    pub delta: f64,
    pub pct_slower: f64,
    pub sector_type: Option<TrackCharacter>,
    pub circuit_type: Option<TrackCharacter>,
}

fn best_lap<'a>(
    laps: impl Iterator<Item = &'a QualifyingLap>,
    segment: Segment,
) -> Option<(f64, &'a QualifyingLap)> {
    laps.filter_map(|lap| lap.time(segment).map(|time| (time, lap)))
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
}

/// Deficit of `target` to the field's best in every segment of every session
///
/// Sessions in which the target has no lap are skipped with a log line, as
/// are individual segments the target never completed.
pub fn session_deficits(
    laps: &[QualifyingLap],
    target: &str,
    sessions: &[Session],
) -> Vec<SectorDeficit> {
    let mut by_session: BTreeMap<(i64, &str), Vec<&QualifyingLap>> = BTreeMap::new();
    for lap in laps {
        by_session
            .entry((lap.year, lap.circuit.as_str()))
            .or_default()
            .push(lap);
    }

    let mut deficits = Vec::new();
    for session in sessions {
        let Some(session_laps) = by_session.get(&(session.year, session.circuit.as_str())) else {
            tracing::warn!("No lap data for {}. Skipping.", session);
            continue;
        };
        if !session_laps.iter().any(|lap| lap.team == target) {
            tracing::warn!("No valid and accurate {} lap data for {}. Skipping.", target, session);
            continue;
        }

        for segment in Segment::ALL {
            let Some((field_best, fastest)) = best_lap(session_laps.iter().copied(), segment)
            else {
                continue;
            };
            let Some((target_best, _)) = best_lap(
                session_laps.iter().copied().filter(|lap| lap.team == target),
                segment,
            ) else {
                tracing::debug!(%session, %segment, "target has no time for segment");
                continue;
            };

            let delta = round_to(target_best - field_best, 3);
            let pct_slower = round_to(delta / field_best * 100.0, 3);

            deficits.push(SectorDeficit {
                year: session.year,
                circuit: session.circuit.clone(),
                segment,
                sector: segment.sector_number(),
                team: target.to_string(),
                target_time: target_best,
                field_best_time: field_best,
                fastest_team: fastest.team.clone(),
                delta,
                pct_slower,
                sector_type: segment
                    .sector_number()
                    .and_then(|n| sector_type(&session.circuit, n)),
                circuit_type: circuit_type(&session.circuit),
            });
        }
    }
    deficits
}

/// Which deficit value becomes the observation value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeficitMeasure {
    /// Seconds behind the field's best
    #[default]
    Seconds,
    /// Percent slower than the field's best
    Percent,
}

/// Sector rows (S1-S3) as observations of the sector-delta KPI
pub fn deficits_dataset(deficits: &[SectorDeficit], measure: DeficitMeasure) -> Dataset {
    let observations = deficits
        .iter()
        .filter(|d| d.sector.is_some())
        .map(|d| {
            let value = match measure {
                DeficitMeasure::Seconds => d.delta,
                DeficitMeasure::Percent => d.pct_slower,
            };
            let mut obs = Observation::new(d.team.clone(), value)
                .with(Facet::Year, d.year)
                .with(Facet::Circuit, d.circuit.as_str());
            if let Some(sector) = d.sector {
                obs = obs.with(Facet::Sector, i64::from(sector));
            }
            if let Some(character) = d.sector_type {
                obs = obs.with(Facet::SectorType, character.as_str());
            }
            if let Some(character) = d.circuit_type {
                obs = obs.with(Facet::CircuitType, character.as_str());
            }
            obs
        })
        .collect();

    let schema: DatasetSchema = Kpi::SectorDelta.schema();
    Dataset::from_observations(schema, observations)
}

/// Segment deltas of the target grouped by sector character
pub fn deltas_by_sector_type(
    deficits: &[SectorDeficit],
    measure: DeficitMeasure,
) -> BTreeMap<TrackCharacter, Vec<f64>> {
    let mut groups: BTreeMap<TrackCharacter, Vec<f64>> = BTreeMap::new();
    for d in deficits {
        if let Some(character) = d.sector_type {
            let value = match measure {
                DeficitMeasure::Seconds => d.delta,
                DeficitMeasure::Percent => d.pct_slower,
            };
            groups.entry(character).or_default().push(value);
        }
    }
    groups
}
