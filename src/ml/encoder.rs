//! One-hot encoder for customer records.
//!
//! Categorical levels seen at fit time become `attribute=level` indicator columns; numerical
//! attributes pass through as one column each. Columns are sorted by name and frozen at fit time.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::record::CustomerRecord;
use crate::schema::{AttributeKind, FeatureSchema, SchemaError};

/// One output column of the encoder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    Categorical { attribute: String, level: String },
    Numerical { attribute: String },
}

impl Column {
    /// Display name, e.g. `contract=two_year` or `tenure`.
    pub fn name(&self) -> String {
        match self {
            Column::Categorical { attribute, level } => format!("{attribute}={level}"),
            Column::Numerical { attribute } => attribute.clone(),
        }
    }
}

/// Persisted encoder state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncoderState {
    schema: FeatureSchema,
    columns: Vec<Column>,
}

/// Fitted record-to-vector encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncoderState", into = "EncoderState")]
pub struct FeatureEncoder {
    schema: FeatureSchema,
    columns: Vec<Column>,
    categorical_index: BTreeMap<(String, String), usize>,
    numerical_index: Vec<usize>,
}

impl FeatureEncoder {
    /// Learn the column layout from training records.
    ///
    /// Any record that does not satisfy the schema aborts the fit.
    pub fn fit(schema: &FeatureSchema, records: &[CustomerRecord]) -> Result<Self, SchemaError> {
        schema.validate()?;
        let mut columns = BTreeSet::new();
        for record in records {
            for attribute in &schema.categorical {
                let level = record.categorical_level(attribute)?;
                columns.insert((
                    format!("{attribute}={level}"),
                    Column::Categorical {
                        attribute: attribute.clone(),
                        level,
                    },
                ));
            }
            for attribute in &schema.numerical {
                record.numerical_value(attribute)?;
            }
        }
        for attribute in &schema.numerical {
            columns.insert((
                attribute.clone(),
                Column::Numerical {
                    attribute: attribute.clone(),
                },
            ));
        }
        let columns = columns.into_iter().map(|(_, column)| column).collect();
        Self::from_state(EncoderState {
            schema: schema.clone(),
            columns,
        })
    }

    /// Fit on `records` and encode the same records.
    pub fn fit_transform(
        schema: &FeatureSchema,
        records: &[CustomerRecord],
    ) -> Result<(Self, Array2<f64>), SchemaError> {
        let encoder = Self::fit(schema, records)?;
        let matrix = encoder.transform(records)?;
        Ok((encoder, matrix))
    }

    /// Encode records into a `records.len() x width()` matrix.
    ///
    /// Levels unseen at fit time leave their attribute's columns at zero.
    pub fn transform(&self, records: &[CustomerRecord]) -> Result<Array2<f64>, SchemaError> {
        let mut matrix = Array2::<f64>::zeros((records.len(), self.columns.len()));
        for (row, record) in records.iter().enumerate() {
            for attribute in &self.schema.categorical {
                let level = record.categorical_level(attribute)?;
                if let Some(&col) = self.categorical_index.get(&(attribute.clone(), level)) {
                    matrix[[row, col]] = 1.0;
                }
            }
            for (attribute, &col) in self.schema.numerical.iter().zip(&self.numerical_index) {
                matrix[[row, col]] = record.numerical_value(attribute)?;
            }
        }
        Ok(matrix)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Stable hash of the column layout; classifier halves are stamped with it.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for name in self.feature_names() {
            hasher.update(name.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    fn from_state(state: EncoderState) -> Result<Self, SchemaError> {
        state.schema.validate()?;
        let mut categorical_index = BTreeMap::new();
        let mut numerical_slots: BTreeMap<&str, usize> = BTreeMap::new();
        for (idx, column) in state.columns.iter().enumerate() {
            match column {
                Column::Categorical { attribute, level } => {
                    if state.schema.kind_of(attribute) != Some(AttributeKind::Categorical) {
                        return Err(SchemaError::Invalid(format!(
                            "column '{}' does not belong to a categorical attribute",
                            column.name()
                        )));
                    }
                    if categorical_index
                        .insert((attribute.clone(), level.clone()), idx)
                        .is_some()
                    {
                        return Err(SchemaError::Invalid(format!(
                            "duplicate column '{}'",
                            column.name()
                        )));
                    }
                }
                Column::Numerical { attribute } => {
                    if state.schema.kind_of(attribute) != Some(AttributeKind::Numerical) {
                        return Err(SchemaError::Invalid(format!(
                            "column '{attribute}' does not belong to a numerical attribute"
                        )));
                    }
                    if numerical_slots.insert(attribute.as_str(), idx).is_some() {
                        return Err(SchemaError::Invalid(format!(
                            "duplicate column '{attribute}'"
                        )));
                    }
                }
            }
        }
        let mut numerical_index = Vec::with_capacity(state.schema.numerical.len());
        for attribute in &state.schema.numerical {
            let idx = numerical_slots.get(attribute.as_str()).copied().ok_or_else(|| {
                SchemaError::Invalid(format!("no column for numerical attribute '{attribute}'"))
            })?;
            numerical_index.push(idx);
        }
        Ok(Self {
            schema: state.schema,
            columns: state.columns,
            categorical_index,
            numerical_index,
        })
    }
}

impl TryFrom<EncoderState> for FeatureEncoder {
    type Error = SchemaError;

    fn try_from(state: EncoderState) -> Result<Self, Self::Error> {
        Self::from_state(state)
    }
}

impl From<FeatureEncoder> for EncoderState {
    fn from(encoder: FeatureEncoder) -> Self {
        Self {
            schema: encoder.schema,
            columns: encoder.columns,
        }
    }
}
