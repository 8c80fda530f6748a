//! Feature schema shared by training and inference.
//!
//! The schema is an explicit value handed to the encoder, trainer and predictor. Two schemas can
//! coexist in one process, which keeps tests free of global state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numerical attributes of the bundled churn dataset.
pub const CHURN_NUMERICAL: &[&str] = &["tenure", "monthlycharges", "totalcharges"];

/// Categorical attributes of the bundled churn dataset.
pub const CHURN_CATEGORICAL: &[&str] = &[
    "gender",
    "seniorcitizen",
    "partner",
    "dependents",
    "phoneservice",
    "multiplelines",
    "internetservice",
    "onlinesecurity",
    "onlinebackup",
    "deviceprotection",
    "techsupport",
    "streamingtv",
    "streamingmovies",
    "contract",
    "paperlessbilling",
    "paymentmethod",
];

/// Whether an attribute is one-hot expanded or passed through as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Categorical,
    Numerical,
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeKind::Categorical => f.write_str("categorical"),
            AttributeKind::Numerical => f.write_str("numerical"),
        }
    }
}

/// Record or schema shape violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A declared attribute is absent from the record.
    #[error("missing attribute '{attribute}'")]
    MissingAttribute { attribute: String },
    /// The attribute value does not match the declared kind.
    #[error("attribute '{attribute}' expects a {expected} value, got {found}")]
    WrongKind {
        attribute: String,
        expected: AttributeKind,
        found: String,
    },
    /// The schema itself is unusable.
    #[error("invalid schema: {0}")]
    Invalid(String),
}

/// Ordered categorical and numerical attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
}

impl FeatureSchema {
    /// Build and validate a schema from attribute name lists.
    pub fn new<C, N>(categorical: C, numerical: N) -> Result<Self, SchemaError>
    where
        C: IntoIterator,
        C::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        let schema = Self {
            categorical: categorical.into_iter().map(Into::into).collect(),
            numerical: numerical.into_iter().map(Into::into).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Schema of the telco churn dataset.
    pub fn churn_default() -> Self {
        Self {
            categorical: CHURN_CATEGORICAL.iter().map(|s| (*s).to_string()).collect(),
            numerical: CHURN_NUMERICAL.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Check that names are non-empty and unique across both lists.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.categorical.is_empty() && self.numerical.is_empty() {
            return Err(SchemaError::Invalid("no attributes declared".to_string()));
        }
        let mut seen = BTreeSet::new();
        for name in self.attributes().map(|(name, _)| name) {
            if name.trim().is_empty() {
                return Err(SchemaError::Invalid("empty attribute name".to_string()));
            }
            if !seen.insert(name) {
                return Err(SchemaError::Invalid(format!(
                    "attribute '{name}' declared twice"
                )));
            }
        }
        Ok(())
    }

    /// Iterate every attribute with its kind, categorical first.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, AttributeKind)> {
        self.categorical
            .iter()
            .map(|name| (name.as_str(), AttributeKind::Categorical))
            .chain(
                self.numerical
                    .iter()
                    .map(|name| (name.as_str(), AttributeKind::Numerical)),
            )
    }

    pub fn kind_of(&self, attribute: &str) -> Option<AttributeKind> {
        self.attributes()
            .find(|(name, _)| *name == attribute)
            .map(|(_, kind)| kind)
    }

    pub fn len(&self) -> usize {
        self.categorical.len() + self.numerical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::churn_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn churn_schema_validates() {
        let schema = FeatureSchema::churn_default();
        schema.validate().unwrap();
        assert_eq!(schema.len(), 19);
        assert_eq!(schema.kind_of("tenure"), Some(AttributeKind::Numerical));
        assert_eq!(schema.kind_of("contract"), Some(AttributeKind::Categorical));
        assert_eq!(schema.kind_of("customerid"), None);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = FeatureSchema::new(["plan", "tenure"], ["tenure"]).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid(_)));
    }

    #[test]
    fn empty_schema_is_rejected() {
        let err = FeatureSchema::new(Vec::<String>::new(), Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid(_)));
    }
}
