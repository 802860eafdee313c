//! Raw delimited-text table
//!
//! Comma-delimited, first row holds the column names. Cells are kept as text;
//! typing happens in [`crate::dataset`] against an explicit schema.

use crate::error::{AnalysisError, Result};
use std::io::Read;
use std::path::Path;

/// An in-memory table read once from a delimited text source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from headers and rows (rows must match header width)
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(AnalysisError::MalformedTable(format!(
                "row {} has {} cells, expected {}",
                index + 1,
                row.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    /// Read a CSV file from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "loaded table"
        );
        Ok(table)
    }

    /// Read CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Read CSV from an in-memory string
    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Position of a column, or a Schema error naming it
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AnalysisError::Schema {
                column: name.to_string(),
                available: self.headers.join(", "),
            })
    }

    /// Parse a column as numbers; blank or unparseable cells become `None`
    ///
    /// Non-finite values (`NaN`, `inf`) are also reported as `None` so callers
    /// can count and exclude them rather than propagate them.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let index = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| parse_finite(&row[index]))
            .collect())
    }
}

/// Parse a cell as a finite f64
pub(crate) fn parse_finite(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIT_CSV: &str = "constructor_ref,gp_year,pit_duration_ms\n\
                           williams,2019,23500\n\
                           renault,2019,22900\n\
                           haas,2019,\n";

    #[test]
    fn test_reads_headers_and_rows() {
        let table = Table::from_csv_str(PIT_CSV).unwrap();
        assert_eq!(
            table.headers(),
            &["constructor_ref", "gp_year", "pit_duration_ms"]
        );
        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let table = Table::from_csv_str(PIT_CSV).unwrap();
        match table.column_index("gp_name") {
            Err(AnalysisError::Schema { column, available }) => {
                assert_eq!(column, "gp_name");
                assert!(available.contains("constructor_ref"));
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_column_marks_blank_cells() {
        let table = Table::from_csv_str(PIT_CSV).unwrap();
        let values = table.numeric_column("pit_duration_ms").unwrap();
        assert_eq!(values, vec![Some(23500.0), Some(22900.0), None]);
    }

    #[test]
    fn test_parse_finite_rejects_nan_and_inf() {
        assert_eq!(parse_finite("NaN"), None);
        assert_eq!(parse_finite("inf"), None);
        assert_eq!(parse_finite(" 1.5 "), Some(1.5));
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let result = Table::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pits.csv");
        std::fs::write(&path, PIT_CSV).unwrap();
        let table = Table::from_path(&path).unwrap();
        assert_eq!(table.len(), 3);
    }
}
