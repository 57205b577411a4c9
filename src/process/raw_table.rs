use csv::ReaderBuilder;
use std::{fs::File, io::Read, path::Path};
use tracing::debug;

use crate::error::{ParseError, Result};

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names from the CSV header row, as published.
    pub headers: Vec<String>,
    /// Each data row, as a Vec of Strings (one per field).
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Read a CSV document with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let table = Self { headers, rows };
        debug!(
            columns = table.headers.len(),
            rows = table.rows.len(),
            "parsed raw CSV"
        );
        Ok(table)
    }

    /// Read a saved CSV snapshot from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Position of `name` in the header row.
    pub fn column(&self, name: &'static str) -> std::result::Result<usize, ParseError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or(ParseError::MissingColumn(name))
    }

    /// Cell at (`row`, `col`); short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}
