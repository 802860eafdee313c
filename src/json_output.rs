//! JSON output format for pipeline results
//!
//! One envelope per run: format identifier, the applied filters, the rows
//! excluded at load time, and whichever result sections the subcommand
//! produced. Sections that were not computed are omitted.

use crate::aggregate::GroupStatistics;
use crate::benchmark::BenchmarkTable;
use crate::correlation::Correlation;
use crate::dataset::ExclusionReport;
use crate::error::Result;
use crate::hypothesis::TestPair;
use crate::outlier::ScreenResult;
use crate::sectors::SectorDeficit;
use serde::Serialize;

/// Outlier screens applied to each group before testing
#[derive(Debug, Clone, Serialize)]
pub struct JsonScreens {
    pub group_a: ScreenResult,
    pub group_b: ScreenResult,
}

/// Complete JSON document
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Crate version that produced the document
    pub version: String,
    /// Format name
    pub format: String,
    /// KPI preset the input was read with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi: Option<String>,
    /// Human-readable filter constraints, empty for all data
    pub filters: Vec<String>,
    pub exclusions: ExclusionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Vec<GroupStatistics>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screens: Option<JsonScreens>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<TestPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Correlation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deficits: Option<Vec<SectorDeficit>>,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "pitwall-json-v1".to_string(),
            kpi: None,
            filters: Vec::new(),
            exclusions: ExclusionReport::default(),
            statistics: None,
            benchmark: None,
            screens: None,
            test: None,
            correlation: None,
            deficits: None,
        }
    }

    pub fn with_kpi(mut self, kpi: impl Into<String>) -> Self {
        self.kpi = Some(kpi.into());
        self
    }

    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionReport) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn set_statistics(&mut self, rows: Vec<GroupStatistics>) {
        self.statistics = Some(rows);
    }

    pub fn set_benchmark(&mut self, table: BenchmarkTable) {
        self.benchmark = Some(table);
    }

    pub fn set_screens(&mut self, group_a: ScreenResult, group_b: ScreenResult) {
        self.screens = Some(JsonScreens { group_a, group_b });
    }

    pub fn set_test(&mut self, pair: TestPair) {
        self.test = Some(pair);
    }

    pub fn set_correlation(&mut self, correlation: Correlation) {
        self.correlation = Some(correlation);
    }

    pub fn set_deficits(&mut self, deficits: Vec<SectorDeficit>) {
        self.deficits = Some(deficits);
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}
