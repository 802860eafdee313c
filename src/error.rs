//! Error taxonomy for the analysis pipeline
//!
//! Lower stages (table, dataset, filter, aggregate) fail only on schema or
//! input problems. Upper stages (benchmark, hypothesis, correlation) surface
//! degenerate inputs instead of emitting `inf`/`NaN`.

use thiserror::Error;

/// Errors produced by pipeline stages
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A column referenced by the schema, filter or aggregation key is absent
    #[error("Schema error: column '{column}' not found in input (available: {available})")]
    Schema { column: String, available: String },

    /// Filtering produced no rows where a later stage needs at least one
    #[error("Empty result set: {0}")]
    EmptyResultSet(String),

    /// The best value used as a percentage denominator is zero
    #[error("Degenerate benchmark: best {statistic} is zero, percentage offset is undefined")]
    DegenerateBenchmark { statistic: String },

    /// Sample too small or degenerate for the requested statistic
    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("Malformed table: {0}")]
    MalformedTable(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A cell could not be parsed as the type its column requires
    #[error("Parse error at row {row}, column '{column}': cannot read '{value}' as {expected}")]
    Parse {
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("Statistics backend failed: {0}")]
    Stats(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AnalysisError {
    /// Shorthand for [`AnalysisError::InsufficientData`]
    pub fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_column() {
        let err = AnalysisError::Schema {
            column: "gp_year".to_string(),
            available: "constructor_ref, pit_duration_ms".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("gp_year"));
        assert!(msg.contains("pit_duration_ms"));
    }

    #[test]
    fn test_insufficient_shorthand() {
        let err = AnalysisError::insufficient("sample A has 1 observation");
        assert!(matches!(err, AnalysisError::InsufficientData { .. }));
        assert!(err.to_string().contains("sample A has 1 observation"));
    }

    #[test]
    fn test_degenerate_benchmark_message() {
        let err = AnalysisError::DegenerateBenchmark {
            statistic: "mad".to_string(),
        };
        assert!(err.to_string().contains("best mad is zero"));
    }
}
