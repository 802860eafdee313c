//! KPI presets for the four analysis areas
//!
//! Each preset knows the column layout of its processed CSV export, the unit
//! its values are reported in, which statistics it benchmarks on, and the
//! direction of its stated hypothesis.

use crate::aggregate::{BenchmarkMetrics, Location, Spread};
use crate::dataset::{Dataset, DatasetSchema, Facet, FacetValue, ValueRule};
use crate::error::Result;
use crate::hypothesis::Direction;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Analysis area
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kpi {
    /// Pit-stop duration per constructor (ms in, seconds out)
    PitStops,
    /// Grid-to-finish position delta per constructor
    GridDelta,
    /// Qualifying sector deficit to the fastest midfield rival (seconds)
    SectorDelta,
    /// Lap-time standard deviation per driver and race (ms)
    LapConsistency,
}

impl Kpi {
    /// Column layout of the processed export for this KPI
    pub fn schema(self) -> DatasetSchema {
        match self {
            Kpi::PitStops => DatasetSchema::new("constructor_ref", "pit_duration_ms")
                .with_facet(Facet::Year)
                .with_facet(Facet::Circuit)
                .with_facet(Facet::LongStop)
                .with_facet(Facet::ChaoticSession)
                .with_value_rule(ValueRule::Positive),
            Kpi::GridDelta => DatasetSchema::new("constructor_ref", "grid_delta")
                .with_facet(Facet::Year)
                .with_facet(Facet::Circuit),
            Kpi::SectorDelta => DatasetSchema::new("team", "sector_delta_s")
                .with_facet(Facet::Year)
                .with_facet(Facet::Circuit)
                .with_facet(Facet::Sector)
                .with_facet(Facet::SectorType)
                .with_facet(Facet::CircuitType),
            Kpi::LapConsistency => DatasetSchema::new("driver_name", "laptime_std_ms")
                .with_facet(Facet::Year)
                .with_facet(Facet::Circuit)
                .with_facet(Facet::Experience)
                .with_value_rule(ValueRule::Positive),
        }
    }

    /// Divisor applied to raw values before reporting
    pub fn scale(self) -> f64 {
        match self {
            Kpi::PitStops => 1000.0,
            Kpi::GridDelta | Kpi::SectorDelta | Kpi::LapConsistency => 1.0,
        }
    }

    /// Unit of reported statistics
    pub fn unit(self) -> &'static str {
        match self {
            Kpi::PitStops | Kpi::SectorDelta => "s",
            Kpi::GridDelta => "positions",
            Kpi::LapConsistency => "ms",
        }
    }

    /// Pit stops keep their outliers, so they benchmark on robust statistics.
    /// Grid delta is places gained, so the highest mean leads.
    pub fn metrics(self) -> BenchmarkMetrics {
        match self {
            Kpi::PitStops => BenchmarkMetrics::new(Location::Median, Spread::Mad),
            Kpi::GridDelta => {
                BenchmarkMetrics::new(Location::Mean, Spread::StdDev).higher_is_better()
            }
            Kpi::SectorDelta | Kpi::LapConsistency => {
                BenchmarkMetrics::new(Location::Mean, Spread::StdDev)
            }
        }
    }

    /// Direction of the alternative hypothesis, group A relative to group B
    ///
    /// - pit stops: Williams slower than rivals
    /// - grid delta: Williams loses more places than rivals
    /// - sector delta: technical deficits larger than power deficits
    /// - lap consistency: rookies less consistent than experienced drivers
    pub fn hypothesis_direction(self) -> Direction {
        match self {
            Kpi::GridDelta => Direction::Less,
            Kpi::PitStops | Kpi::SectorDelta | Kpi::LapConsistency => Direction::Greater,
        }
    }

    /// Filter expressions selecting the two groups the hypothesis compares
    pub fn comparison_groups(self) -> (String, String) {
        match self {
            Kpi::PitStops | Kpi::GridDelta => (
                format!("subjects={}", TARGET_CONSTRUCTOR),
                format!("subjects={}", RIVAL_CONSTRUCTORS.join(",")),
            ),
            Kpi::SectorDelta => (
                "sector_type=technical".to_string(),
                "sector_type=power".to_string(),
            ),
            Kpi::LapConsistency => (
                "experience=rookie".to_string(),
                "experience=experienced".to_string(),
            ),
        }
    }

    /// Read a processed export with this KPI's schema
    ///
    /// Exports without a circuit-type column get one derived from the circuit
    /// name so every KPI can be filtered on track character.
    pub fn load(self, path: impl AsRef<Path>) -> Result<Dataset> {
        let dataset = Dataset::from_path(path, self.schema())?;
        if dataset.has_facet(Facet::CircuitType) {
            Ok(dataset)
        } else {
            label_circuit_types(&dataset)
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kpi::PitStops => "pit-stops",
            Kpi::GridDelta => "grid-delta",
            Kpi::SectorDelta => "sector-delta",
            Kpi::LapConsistency => "lap-consistency",
        }
    }
}

impl fmt::Display for Kpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Character of a circuit or sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackCharacter {
    Power,
    Technical,
    Balanced,
}

impl TrackCharacter {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackCharacter::Power => "power",
            TrackCharacter::Technical => "technical",
            TrackCharacter::Balanced => "balanced",
        }
    }
}

impl fmt::Display for TrackCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The team under evaluation
pub const TARGET_TEAM: &str = "Williams";

/// Constructor reference of the team under evaluation
pub const TARGET_CONSTRUCTOR: &str = "williams";

/// Constructor references of the target's midfield rivals
pub const RIVAL_CONSTRUCTORS: [&str; 4] = ["renault", "haas", "force_india", "racing_point"];

/// Midfield field the target is benchmarked against (team names as in timing data)
pub const MIDFIELD_TEAMS: [&str; 5] = [
    "Williams",
    "Racing Point",
    "Force India",
    "Haas F1 Team",
    "Renault",
];

/// High-downforce circuits used for the grid-delta hypothesis
pub const HIGH_DOWNFORCE_CIRCUITS: [&str; 3] = [
    "Monaco Grand Prix",
    "Singapore Grand Prix",
    "Hungarian Grand Prix",
];

use TrackCharacter::{Balanced, Power, Technical};

// (circuit, overall character, [S1, S2, S3])
const CIRCUITS: [(&str, TrackCharacter, [TrackCharacter; 3]); 10] = [
    ("Italian Grand Prix", Power, [Power, Power, Power]),
    ("Monaco Grand Prix", Technical, [Technical, Technical, Technical]),
    ("British Grand Prix", Balanced, [Balanced, Balanced, Balanced]),
    ("Belgian Grand Prix", Power, [Power, Balanced, Power]),
    ("Spanish Grand Prix", Balanced, [Power, Balanced, Balanced]),
    ("Singapore Grand Prix", Technical, [Technical, Technical, Technical]),
    ("Brazilian Grand Prix", Power, [Power, Balanced, Power]),
    ("Hungarian Grand Prix", Technical, [Balanced, Technical, Technical]),
    ("Austrian Grand Prix", Power, [Power, Power, Power]),
    ("Japanese Grand Prix", Balanced, [Technical, Balanced, Balanced]),
];

/// Overall character of one of the analysed circuits
pub fn circuit_type(circuit: &str) -> Option<TrackCharacter> {
    CIRCUITS
        .iter()
        .find(|(name, _, _)| *name == circuit)
        .map(|(_, character, _)| *character)
}

/// Character of a sector (1-3) of one of the analysed circuits
pub fn sector_type(circuit: &str, sector: u8) -> Option<TrackCharacter> {
    if !(1..=3).contains(&sector) {
        return None;
    }
    CIRCUITS
        .iter()
        .find(|(name, _, _)| *name == circuit)
        .map(|(_, _, sectors)| sectors[usize::from(sector - 1)])
}

/// Attach a circuit-type facet derived from each observation's circuit
///
/// Circuits outside the classified ten carry no circuit type and are dropped
/// by any filter constrained on it.
pub fn label_circuit_types(dataset: &Dataset) -> Result<Dataset> {
    dataset.require_facet(Facet::Circuit)?;
    Ok(dataset.derive_facet(Facet::CircuitType, |obs| match obs.facet(Facet::Circuit) {
        Some(FacetValue::Text(name)) => {
            circuit_type(name).map(|character| FacetValue::from(character.as_str()))
        }
        _ => None,
    }))
}

/// Names of all classified circuits
pub fn analysed_circuits() -> impl Iterator<Item = &'static str> {
    CIRCUITS.iter().map(|(name, _, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_delta_rewards_places_gained() {
        use crate::aggregate::Better;
        assert_eq!(Kpi::GridDelta.metrics().better, Better::Higher);
        assert_eq!(Kpi::PitStops.metrics().better, Better::Lower);
        assert_eq!(Kpi::SectorDelta.metrics().better, Better::Lower);
    }

    #[test]
    fn test_circuit_type_lookup() {
        assert_eq!(circuit_type("Monaco Grand Prix"), Some(Technical));
        assert_eq!(circuit_type("Italian Grand Prix"), Some(Power));
        assert_eq!(circuit_type("Japanese Grand Prix"), Some(Balanced));
        assert_eq!(circuit_type("Bahrain Grand Prix"), None);
    }

    #[test]
    fn test_sector_type_lookup() {
        assert_eq!(sector_type("Hungarian Grand Prix", 1), Some(Balanced));
        assert_eq!(sector_type("Hungarian Grand Prix", 2), Some(Technical));
        assert_eq!(sector_type("Japanese Grand Prix", 1), Some(Technical));
        assert_eq!(sector_type("Monaco Grand Prix", 0), None);
        assert_eq!(sector_type("Monaco Grand Prix", 4), None);
    }

    #[test]
    fn test_ten_circuits_classified() {
        assert_eq!(analysed_circuits().count(), 10);
        for circuit in HIGH_DOWNFORCE_CIRCUITS {
            assert_eq!(circuit_type(circuit), Some(Technical));
        }
    }

    #[test]
    fn test_pit_stop_preset() {
        let schema = Kpi::PitStops.schema();
        assert_eq!(schema.subject_column, "constructor_ref");
        assert_eq!(schema.value_column, "pit_duration_ms");
        assert!(schema.facet_columns.contains_key(&Facet::LongStop));
        assert_eq!(schema.value_rule, ValueRule::Positive);
        assert_eq!(Kpi::PitStops.scale(), 1000.0);
        assert_eq!(Kpi::PitStops.metrics().primary, Location::Median);
    }

    #[test]
    fn test_comparison_groups_parse() {
        use crate::filter::FilterSpec;

        for kpi in [Kpi::PitStops, Kpi::GridDelta, Kpi::SectorDelta, Kpi::LapConsistency] {
            let (a, b) = kpi.comparison_groups();
            assert!(FilterSpec::all().with_expr(&a).is_ok());
            assert!(FilterSpec::all().with_expr(&b).is_ok());
        }
        let (_, rivals) = Kpi::PitStops.comparison_groups();
        assert!(rivals.contains("force_india"));
        assert!(!rivals.contains(TARGET_CONSTRUCTOR));
    }

    #[test]
    fn test_hypothesis_directions() {
        assert_eq!(Kpi::GridDelta.hypothesis_direction(), Direction::Less);
        assert_eq!(Kpi::LapConsistency.hypothesis_direction(), Direction::Greater);
    }

    #[test]
    fn test_label_circuit_types() {
        use crate::dataset::Observation;

        let dataset = Dataset::from_observations(
            Kpi::GridDelta.schema(),
            vec![
                Observation::new("williams", -2.0).with(Facet::Circuit, "Monaco Grand Prix"),
                Observation::new("williams", 1.0).with(Facet::Circuit, "Bahrain Grand Prix"),
            ],
        );
        let labelled = label_circuit_types(&dataset).unwrap();
        assert_eq!(
            labelled.observations()[0].facet(Facet::CircuitType),
            Some(&FacetValue::from("technical"))
        );
        assert_eq!(labelled.observations()[1].facet(Facet::CircuitType), None);
    }

    #[test]
    fn test_label_circuit_types_requires_circuit() {
        let dataset = Dataset::from_observations(DatasetSchema::new("team", "delta"), vec![]);
        assert!(label_circuit_types(&dataset).is_err());
    }

    #[test]
    fn test_target_is_midfield() {
        assert!(MIDFIELD_TEAMS.contains(&TARGET_TEAM));
    }
}
