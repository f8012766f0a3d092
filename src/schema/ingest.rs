//! Raw delimited-table ingestion.

use crate::error::{CosechaError, Result};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A rectangular table of untyped cells with its header row.
///
/// Cells are kept verbatim; interpretation happens in
/// [`SchemaNormalizer::normalize`](super::SchemaNormalizer::normalize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table from headers and rows.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch if any row is not as wide as the header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(CosechaError::DimensionMismatch {
                expected: format!("{} cells per row", headers.len()),
                actual: format!("{} cells in data row {idx}", row.len()),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Reads a CSV document with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not well-formed CSV or rows are ragged.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        debug!(columns = headers.len(), rows = rows.len(), "read raw table");
        Self::new(headers, rows)
    }

    /// Reads a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Header row.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Keeps only the rows at `indices`, in the order given.
    ///
    /// Out-of-range indices are skipped.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }
}
