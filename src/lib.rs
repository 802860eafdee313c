//! Pitwall - comparative benchmark pipeline for Formula 1 race data
//!
//! This library provides the stages of a load → filter → aggregate →
//! benchmark → test pipeline over pre-processed race exports (pit stops,
//! grid-to-finish deltas, qualifying sector deficits and lap-time
//! consistency), each stage a pure transformation of the previous stage's
//! tabular output.
//!
//! ```
//! use pitwall::aggregate::{aggregate, AggregateOptions};
//! use pitwall::benchmark::benchmark_against_best;
//! use pitwall::dataset::Dataset;
//! use pitwall::filter::FilterSpec;
//! use pitwall::kpi::Kpi;
//! use pitwall::table::Table;
//!
//! let table = Table::from_csv_str(
//!     "constructor_ref,pit_duration_ms,gp_year,gp_name,long_stop_flag,chaotic_race_flag\n\
//!      williams,23500,2017,Monaco Grand Prix,0,0\n\
//!      renault,22900,2017,Monaco Grand Prix,0,0\n\
//!      renault,23000,2017,Monaco Grand Prix,0,0\n",
//! )
//! .unwrap();
//! let dataset = Dataset::from_table(&table, Kpi::PitStops.schema()).unwrap();
//!
//! let options = AggregateOptions::new(Kpi::PitStops.metrics()).with_scale(Kpi::PitStops.scale());
//! let rows = aggregate(&dataset, &FilterSpec::all().year(2017), &options).unwrap();
//! let table = benchmark_against_best(&rows, &options.metrics, 3, 2).unwrap();
//!
//! assert_eq!(table.leader().unwrap().subject_id, "renault");
//! ```

pub mod aggregate;
pub mod benchmark;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod csv_output;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod hypothesis;
pub mod json_output;
pub mod kpi;
pub mod outlier;
pub mod report;
pub mod sectors;
pub mod stats;
pub mod table;

pub use error::{AnalysisError, Result};
