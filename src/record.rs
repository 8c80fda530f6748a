//! Customer records as read from CSV rows or request bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{AttributeKind, FeatureSchema, SchemaError};

/// Raw scalar value of a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    fn describe(&self) -> String {
        match self {
            FeatureValue::Number(value) => format!("number {value}"),
            FeatureValue::Text(value) => format!("text '{value}'"),
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Number(value as f64)
    }
}

/// One customer: attribute name to raw value.
///
/// Attributes outside the schema are carried along but never encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerRecord {
    values: BTreeMap<String, FeatureValue>,
}

impl CustomerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(attribute, value);
        self
    }

    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(attribute.into(), value.into());
    }

    pub fn get(&self, attribute: &str) -> Option<&FeatureValue> {
        self.values.get(attribute)
    }

    pub fn remove(&mut self, attribute: &str) -> Option<FeatureValue> {
        self.values.remove(attribute)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Level of a categorical attribute; numbers are rendered as text.
    pub fn categorical_level(&self, attribute: &str) -> Result<String, SchemaError> {
        match self.require(attribute)? {
            FeatureValue::Text(value) => Ok(value.clone()),
            FeatureValue::Number(value) if value.is_finite() => Ok(canonical_number(*value)),
            other => Err(SchemaError::WrongKind {
                attribute: attribute.to_string(),
                expected: AttributeKind::Categorical,
                found: other.describe(),
            }),
        }
    }

    /// Value of a numerical attribute. Text is never parsed here.
    pub fn numerical_value(&self, attribute: &str) -> Result<f64, SchemaError> {
        match self.require(attribute)? {
            FeatureValue::Number(value) if value.is_finite() => Ok(*value),
            other => Err(SchemaError::WrongKind {
                attribute: attribute.to_string(),
                expected: AttributeKind::Numerical,
                found: other.describe(),
            }),
        }
    }

    /// Check every declared attribute is present with a usable kind.
    pub fn validate(&self, schema: &FeatureSchema) -> Result<(), SchemaError> {
        for (name, kind) in schema.attributes() {
            match kind {
                AttributeKind::Categorical => self.categorical_level(name).map(|_| ())?,
                AttributeKind::Numerical => self.numerical_value(name).map(|_| ())?,
            }
        }
        Ok(())
    }

    fn require(&self, attribute: &str) -> Result<&FeatureValue, SchemaError> {
        self.values
            .get(attribute)
            .ok_or_else(|| SchemaError::MissingAttribute {
                attribute: attribute.to_string(),
            })
    }
}

impl<K, V> FromIterator<(K, V)> for CustomerRecord
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Integral numbers render without a fraction so `0` and `"0"` share a level.
fn canonical_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// The reference customer used by smoke tests and the predict utility.
pub fn example_customer() -> CustomerRecord {
    CustomerRecord::new()
        .with("gender", "female")
        .with("seniorcitizen", 0i64)
        .with("partner", "yes")
        .with("dependents", "no")
        .with("phoneservice", "no")
        .with("multiplelines", "no_phone_service")
        .with("internetservice", "dsl")
        .with("onlinesecurity", "no")
        .with("onlinebackup", "yes")
        .with("deviceprotection", "no")
        .with("techsupport", "no")
        .with("streamingtv", "no")
        .with("streamingmovies", "no")
        .with("contract", "month-to-month")
        .with("paperlessbilling", "yes")
        .with("paymentmethod", "electronic_check")
        .with("tenure", 1i64)
        .with("monthlycharges", 29.85)
        .with("totalcharges", 29.85)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_customer_matches_churn_schema() {
        example_customer()
            .validate(&FeatureSchema::churn_default())
            .unwrap();
    }

    #[test]
    fn integral_numbers_share_level_with_text() {
        let record = CustomerRecord::new()
            .with("seniorcitizen", 1i64)
            .with("rate", 0.5);
        assert_eq!(record.categorical_level("seniorcitizen").unwrap(), "1");
        assert_eq!(record.categorical_level("rate").unwrap(), "0.5");
    }

    #[test]
    fn text_for_numerical_is_wrong_kind() {
        let record = CustomerRecord::new().with("tenure", "12");
        let err = record.numerical_value("tenure").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::WrongKind {
                expected: AttributeKind::Numerical,
                ..
            }
        ));
    }

    #[test]
    fn missing_attribute_is_reported_by_name() {
        let mut record = example_customer();
        record.remove("contract");
        let err = record
            .validate(&FeatureSchema::churn_default())
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingAttribute {
                attribute: "contract".to_string()
            }
        );
    }

    #[test]
    fn json_object_deserializes_into_record() {
        let record: CustomerRecord =
            serde_json::from_str(r#"{"contract":"two_year","tenure":24}"#).unwrap();
        assert_eq!(record.get("tenure"), Some(&FeatureValue::Number(24.0)));
        assert_eq!(
            record.get("contract"),
            Some(&FeatureValue::Text("two_year".to_string()))
        );
    }
}
