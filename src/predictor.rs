//! Churn probabilities from a trained artifact.

use thiserror::Error;

use crate::artifact::TrainedArtifact;
use crate::ml::logreg::LogRegError;
use crate::record::CustomerRecord;
use crate::schema::SchemaError;

/// Scoring failures: the record is at fault, or the artifact is.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("artifact cannot score encoded features: {0}")]
    Model(#[from] LogRegError),
    #[error("no probability produced")]
    Empty,
}

/// Encode `records` and score them, preserving order.
pub fn predict(
    records: &[CustomerRecord],
    artifact: &TrainedArtifact,
) -> Result<Vec<f64>, PredictError> {
    let x = artifact.encoder.transform(records)?;
    let probabilities = artifact.model.predict_proba(&x)?;
    Ok(probabilities.to_vec())
}

/// Score a single customer.
pub fn predict_one(
    record: &CustomerRecord,
    artifact: &TrainedArtifact,
) -> Result<f64, PredictError> {
    let mut probabilities = predict(std::slice::from_ref(record), artifact)?;
    probabilities
        .pop()
        .ok_or(PredictError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoder::FeatureEncoder;
    use crate::ml::logreg::{TrainOptions, train_logreg};
    use crate::schema::FeatureSchema;

    fn artifact() -> TrainedArtifact {
        let schema = FeatureSchema::new(["contract"], ["tenure"]).unwrap();
        let records: Vec<CustomerRecord> = [
            ("month-to-month", 1.0),
            ("month-to-month", 3.0),
            ("two_year", 40.0),
            ("two_year", 50.0),
            ("month-to-month", 45.0),
            ("two_year", 2.0),
        ]
        .into_iter()
        .map(|(contract, tenure)| {
            CustomerRecord::new()
                .with("contract", contract)
                .with("tenure", tenure)
        })
        .collect();
        let (encoder, x) = FeatureEncoder::fit_transform(&schema, &records).unwrap();
        let outcome = train_logreg(&x, &[1, 1, 0, 0, 0, 1], &TrainOptions::default()).unwrap();
        TrainedArtifact::new(encoder, outcome.model).unwrap()
    }

    #[test]
    fn probabilities_are_in_unit_range_and_ordered() {
        let artifact = artifact();
        let records = vec![
            CustomerRecord::new()
                .with("contract", "month-to-month")
                .with("tenure", 1.0),
            CustomerRecord::new()
                .with("contract", "two_year")
                .with("tenure", 60.0),
        ];
        let p = predict(&records, &artifact).unwrap();
        assert_eq!(p.len(), 2);
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(p[0] > p[1]);
        assert_eq!(predict_one(&records[1], &artifact).unwrap(), p[1]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(predict(&[], &artifact()).unwrap().is_empty());
    }

    #[test]
    fn missing_attribute_is_schema_error() {
        let record = CustomerRecord::new().with("tenure", 5.0);
        let err = predict(&[record], &artifact()).unwrap_err();
        assert!(matches!(
            err,
            PredictError::Schema(SchemaError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn width_mismatch_is_a_model_error() {
        let mut artifact = artifact();
        artifact.model.feature_dim += 1;
        artifact.model.weights.push(0.0);
        let record = CustomerRecord::new()
            .with("contract", "two_year")
            .with("tenure", 12.0);
        let err = predict_one(&record, &artifact).unwrap_err();
        assert!(matches!(
            err,
            PredictError::Model(LogRegError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn unseen_level_still_scores() {
        let record = CustomerRecord::new()
            .with("contract", "one_year")
            .with("tenure", 12.0);
        let p = predict_one(&record, &artifact()).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}
