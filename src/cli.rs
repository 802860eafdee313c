//! CLI argument parsing for pitwall

use crate::config::AnalysisConfig;
use crate::dataset::Facet;
use crate::error::Result;
use crate::hypothesis::Direction;
use crate::kpi::{Kpi, MIDFIELD_TEAMS, TARGET_TEAM};
use crate::outlier::TailDrops;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for pipeline results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "pitwall")]
#[command(version)]
#[command(
    about = "Comparative benchmark pipeline for Formula 1 race data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Analysis configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Significance level, overrides the configuration file
    #[arg(long, global = true, value_name = "ALPHA")]
    pub alpha: Option<f64>,

    /// Decimal places for reported statistics, overrides the configuration file
    #[arg(long, global = true, value_name = "DIGITS")]
    pub precision: Option<u32>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Write results to FILE instead of stdout
    #[arg(short = 'o', long = "output", global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log pipeline internals to stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(alpha) = self.alpha {
            config.significance_level = alpha;
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Descriptive statistics per group
    Stats(GroupArgs),
    /// Statistics per group with offsets from the best group
    Benchmark(GroupArgs),
    /// Welch's t-test and Mann-Whitney U between two groups
    Test(TestArgs),
    /// Pearson correlation between two numeric columns
    Correlate(CorrelateArgs),
    /// Qualifying sector deficits of a team to the field's best
    Sectors(SectorArgs),
}

/// Input file, KPI preset and filters shared by the dataset commands
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Processed CSV export
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// KPI preset describing the file's columns
    #[arg(short, long, value_enum, default_value = "pit-stops")]
    pub kpi: Kpi,

    /// Filter expression (e.g. -e year=2017 -e circuit_type=technical -e year=2015..2019)
    #[arg(short = 'e', long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GroupArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Group by a facet instead of by subject
    #[arg(long = "group-by", value_name = "FACET")]
    pub group_by: Option<Facet>,
}

#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Filter expression selecting group A (defaults to the KPI's hypothesis)
    #[arg(long = "group-a", value_name = "EXPR")]
    pub group_a: Option<String>,

    /// Filter expression selecting group B (defaults to the KPI's hypothesis)
    #[arg(long = "group-b", value_name = "EXPR")]
    pub group_b: Option<String>,

    /// Alternative hypothesis: A less or greater than B
    #[arg(long, value_enum)]
    pub direction: Option<Direction>,

    /// Remove values with |z| above this threshold before testing
    #[arg(long, value_name = "SIGMA")]
    pub zscore: Option<f64>,

    /// Remove group A's N largest values before testing
    #[arg(long = "drop-largest-a", value_name = "N", default_value = "0")]
    pub drop_largest_a: usize,

    /// Remove group A's N smallest values before testing
    #[arg(long = "drop-smallest-a", value_name = "N", default_value = "0")]
    pub drop_smallest_a: usize,

    /// Remove group B's N largest values before testing
    #[arg(long = "drop-largest-b", value_name = "N", default_value = "0")]
    pub drop_largest_b: usize,

    /// Remove group B's N smallest values before testing
    #[arg(long = "drop-smallest-b", value_name = "N", default_value = "0")]
    pub drop_smallest_b: usize,
}

impl TestArgs {
    pub fn drops_a(&self) -> TailDrops {
        TailDrops::new(self.drop_largest_a, self.drop_smallest_a)
    }

    pub fn drops_b(&self) -> TailDrops {
        TailDrops::new(self.drop_largest_b, self.drop_smallest_b)
    }

    /// Any screen was requested
    pub fn screens_requested(&self) -> bool {
        self.zscore.is_some() || !self.drops_a().is_empty() || !self.drops_b().is_empty()
    }
}

#[derive(Args, Debug)]
pub struct CorrelateArgs {
    /// CSV file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Column of the first variable
    #[arg(short = 'x', long, default_value = "start_position")]
    pub x: String,

    /// Column of the second variable
    #[arg(short = 'y', long, default_value = "grid_delta")]
    pub y: String,

    /// Only use rows of this subject
    #[arg(long, value_name = "ID")]
    pub subject: Option<String>,

    /// Column holding subject identifiers
    #[arg(long = "subject-column", default_value = "constructor_ref")]
    pub subject_column: String,
}

#[derive(Args, Debug)]
pub struct SectorArgs {
    /// Per-lap qualifying export
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Team whose deficit is measured
    #[arg(long, default_value = TARGET_TEAM)]
    pub target: String,

    /// Teams forming the field (comma separated, defaults to the midfield)
    #[arg(long, value_delimiter = ',')]
    pub field: Vec<String>,

    /// Test percent deficits instead of seconds
    #[arg(long)]
    pub percent: bool,

    /// Test technical-sector deficits against power-sector deficits
    #[arg(long)]
    pub test: bool,
}

impl SectorArgs {
    /// Field teams, the midfield when none were given
    pub fn field_teams(&self) -> Vec<String> {
        if self.field.is_empty() {
            MIDFIELD_TEAMS.iter().map(|team| team.to_string()).collect()
        } else {
            self.field.clone()
        }
    }
}
