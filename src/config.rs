// Configuration for significance testing and reporting precision
//
// Alpha is an input, never a constant baked into a test call. The same
// configuration drives the small-sample warning and the rounding applied to
// reported statistics.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration shared by the aggregation, benchmark and test stages
///
/// # Example
/// ```
/// use pitwall::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.significance_level, 0.05); // 95% confidence
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Statistical significance level (alpha) for hypothesis testing
    ///
    /// - 0.05 (default): 95% confidence level
    /// - 0.01: stricter, fewer false positives
    /// - 0.10: looser, fewer false negatives
    pub significance_level: f64,

    /// Minimum observations per sample before a test is attempted
    ///
    /// Both tests need at least 2 observations per sample.
    pub min_sample_size: usize,

    /// Samples smaller than this are flagged as undersized in reports
    ///
    /// Default: 30 (the usual rule of thumb for the t-test's normal approximation)
    pub small_sample_threshold: usize,

    /// Decimal places for reported statistics (time-based stats use 3)
    pub precision: u32,

    /// Decimal places for percent-off-best values
    pub percent_precision: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            min_sample_size: 2,
            small_sample_threshold: 30,
            precision: 3,
            percent_precision: 2,
        }
    }
}

impl AnalysisConfig {
    /// Strict configuration: 99% confidence, larger minimum samples
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            min_sample_size: 5,
            ..Self::default()
        }
    }

    /// Permissive configuration: 90% confidence
    pub fn permissive() -> Self {
        Self {
            significance_level: 0.10,
            ..Self::default()
        }
    }

    /// Load a configuration from a TOML file; missing keys take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            )));
        }

        if self.min_sample_size < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_sample_size must be >= 2, got {}",
                self.min_sample_size
            )));
        }

        if self.precision > 9 || self.percent_precision > 9 {
            return Err(AnalysisError::InvalidConfig(format!(
                "precision must be <= 9 decimal places, got {}/{}",
                self.precision, self.percent_precision
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.significance_level, 0.05);
        assert_eq!(config.min_sample_size, 2);
        assert_eq!(config.small_sample_threshold, 30);
        assert_eq!(config.precision, 3);
        assert_eq!(config.percent_precision, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config() {
        let config = AnalysisConfig::strict();
        assert_eq!(config.significance_level, 0.01);
        assert_eq!(config.min_sample_size, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_permissive_config() {
        let config = AnalysisConfig::permissive();
        assert_eq!(config.significance_level, 0.10);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_significance_level() {
        let mut config = AnalysisConfig::default();
        config.significance_level = 1.5;
        assert!(config.validate().is_err());

        config.significance_level = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_min_sample_size() {
        let mut config = AnalysisConfig::default();
        config.min_sample_size = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AnalysisConfig::from_toml_str("significance_level = 0.01\n").unwrap();
        assert_eq!(config.significance_level, 0.01);
        assert_eq!(config.precision, 3);
    }

    #[test]
    fn test_invalid_toml_value_rejected() {
        let result = AnalysisConfig::from_toml_str("min_sample_size = 1\n");
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pitwall.toml");
        std::fs::write(&path, "significance_level = 0.1\nprecision = 2\n").unwrap();

        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.significance_level, 0.1);
        assert_eq!(config.precision, 2);
    }
}
