//! CSV loader for raw customer tables.

use std::io::Read;
use std::path::Path;

use super::DatasetError;
use super::clean::normalize_token;

/// Header plus string cells, exactly as read from disk apart from header normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Normalized column names (lowercase, whitespace replaced by `_`).
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of a normalized column name.
    pub fn column_index(&self, name: &str) -> Result<usize, DatasetError> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load a header-first CSV file.
pub fn load_csv(path: &Path) -> Result<RawTable, DatasetError> {
    let file = std::fs::File::open(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file)
}

/// Parse CSV from any reader; rows with a wrong cell count are rejected by the parser.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let columns = reader
        .headers()?
        .iter()
        .map(normalize_token)
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    if rows.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(RawTable { columns, rows })
}
