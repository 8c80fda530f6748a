//! Turns a raw table into labeled customer records.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use super::loader::RawTable;
use super::{DatasetError, LabeledDataset};
use crate::record::{CustomerRecord, FeatureValue};
use crate::schema::FeatureSchema;

/// A cell expected to hold a number did not parse.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("'{value}' is not a number")]
pub struct CoercionError {
    pub value: String,
}

/// How raw columns map onto records and labels.
#[derive(Debug, Clone)]
pub struct CleaningOptions {
    /// Normalized name of the label column.
    pub target_column: String,
    /// Normalized label value that counts as churn.
    pub positive_label: String,
    /// Numerical attributes whose unparsable cells become `0`.
    pub coerce_numeric: Vec<String>,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            target_column: "churn".to_string(),
            positive_label: "yes".to_string(),
            coerce_numeric: vec!["totalcharges".to_string()],
        }
    }
}

/// Counters gathered while cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningSummary {
    pub rows: usize,
    pub positives: usize,
    /// Cells replaced by `0`, per attribute.
    pub coerced: BTreeMap<String, usize>,
}

/// Lowercase and replace whitespace with `_`.
///
/// Applied to column names, categorical values and request payload values alike.
pub fn normalize_token(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// Parse a numeric cell, ignoring surrounding whitespace.
pub fn parse_number(raw: &str) -> Result<f64, CoercionError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CoercionError {
            value: raw.to_string(),
        })
}

/// Build labeled records for `schema` from `table`.
pub fn prepare_records(
    table: &RawTable,
    schema: &FeatureSchema,
    options: &CleaningOptions,
) -> Result<(LabeledDataset, CleaningSummary), DatasetError> {
    schema.validate()?;
    let categorical = schema
        .categorical
        .iter()
        .map(|name| Ok((name.as_str(), table.column_index(name)?)))
        .collect::<Result<Vec<_>, DatasetError>>()?;
    let numerical = schema
        .numerical
        .iter()
        .map(|name| {
            let lenient = options.coerce_numeric.iter().any(|c| c == name);
            Ok((name.as_str(), table.column_index(name)?, lenient))
        })
        .collect::<Result<Vec<_>, DatasetError>>()?;
    let target = table.column_index(&options.target_column)?;
    let positive = normalize_token(&options.positive_label);

    let mut summary = CleaningSummary::default();
    let mut records = Vec::with_capacity(table.len());
    let mut labels = Vec::with_capacity(table.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let mut record = CustomerRecord::new();
        for &(name, col) in &categorical {
            record.insert(name, FeatureValue::Text(normalize_token(&row[col])));
        }
        for &(name, col, lenient) in &numerical {
            let value = match parse_number(&row[col]) {
                Ok(value) => value,
                Err(_) if lenient => {
                    *summary.coerced.entry(name.to_string()).or_default() += 1;
                    0.0
                }
                Err(source) => {
                    return Err(DatasetError::InvalidNumber {
                        column: name.to_string(),
                        // header is line 1
                        line: row_idx + 2,
                        source,
                    });
                }
            };
            record.insert(name, FeatureValue::Number(value));
        }
        let label = u8::from(normalize_token(&row[target]) == positive);
        summary.positives += usize::from(label);
        records.push(record);
        labels.push(label);
    }
    summary.rows = records.len();
    debug!(
        rows = summary.rows,
        positives = summary.positives,
        coerced = ?summary.coerced,
        "Prepared training records"
    );
    Ok((LabeledDataset { records, labels }, summary))
}
