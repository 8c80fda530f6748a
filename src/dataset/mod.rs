//! Training data loading and cleaning.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::CustomerRecord;
use crate::schema::{FeatureSchema, SchemaError};

pub mod clean;
pub mod loader;

pub use clean::{CleaningOptions, CleaningSummary, CoercionError, normalize_token};
pub use loader::{RawTable, load_csv, read_csv};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset has no rows")]
    Empty,
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("column '{column}' line {line}: {source}")]
    InvalidNumber {
        column: String,
        line: usize,
        source: CoercionError,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Customer records with aligned binary churn labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledDataset {
    pub records: Vec<CustomerRecord>,
    pub labels: Vec<u8>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> LabeledDataset {
        LabeledDataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Load and clean a training CSV in one call.
pub fn load_training_data(
    path: &Path,
    schema: &FeatureSchema,
    options: &CleaningOptions,
) -> Result<(LabeledDataset, CleaningSummary), DatasetError> {
    let table = load_csv(path)?;
    clean::prepare_records(&table, schema, options)
}
