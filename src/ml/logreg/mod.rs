//! Binary logistic regression over encoded customer vectors.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod train;
pub use train::{ConvergenceError, FitOutcome, TrainOptions, train_logreg};

/// Current serialized model layout.
pub const MODEL_VERSION: i64 = 1;

/// Invalid inputs to fitting or prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LogRegError {
    #[error("empty training set")]
    EmptyTrainingSet,
    #[error("{rows} feature rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("label {0} is not 0 or 1")]
    NonBinaryLabel(u8),
    #[error("regularization strength must be finite and > 0, got {0}")]
    InvalidRegularization(f64),
    #[error("expected {expected} features, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("feature matrix contains non-finite values")]
    NonFinite,
    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Fitted coefficients of a binary logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub model_version: i64,
    /// Fingerprint of the encoder whose columns these weights follow.
    #[serde(default)]
    pub encoder_fingerprint: Option<String>,
    pub feature_dim: usize,
    pub weights: Vec<f64>,
    pub intercept: f64,
    /// Inverse regularization strength used at fit time.
    pub c: f64,
}

impl LogRegModel {
    pub fn validate(&self) -> Result<(), LogRegError> {
        if self.model_version != MODEL_VERSION {
            return Err(LogRegError::InvalidModel(format!(
                "unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            )));
        }
        if self.weights.len() != self.feature_dim {
            return Err(LogRegError::InvalidModel("weights length mismatch".to_string()));
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(LogRegError::InvalidModel("non-finite coefficients".to_string()));
        }
        Ok(())
    }

    /// Linear scores `X·w + b` for each row.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, LogRegError> {
        if x.ncols() != self.feature_dim {
            return Err(LogRegError::DimensionMismatch {
                expected: self.feature_dim,
                found: x.ncols(),
            });
        }
        let weights = ArrayView1::from(self.weights.as_slice());
        Ok(x.dot(&weights) + self.intercept)
    }

    /// Positive-class probability for each row, in `[0, 1]`.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, LogRegError> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }
}

/// Logistic function, stable for large `|z|`.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
pub(crate) fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn model(weights: Vec<f64>, intercept: f64) -> LogRegModel {
        LogRegModel {
            model_version: MODEL_VERSION,
            encoder_fingerprint: None,
            feature_dim: weights.len(),
            weights,
            intercept,
            c: 1.0,
        }
    }

    #[test]
    fn sigmoid_is_bounded_and_symmetric() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(3.0) + sigmoid(-3.0) - 1.0).abs() < 1e-12);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
    }

    #[test]
    fn softplus_matches_naive_form_in_safe_range() {
        for z in [-5.0, -0.5, 0.0, 0.5, 5.0] {
            let naive = (1.0f64 + f64::exp(z)).ln();
            assert!((softplus(z) - naive).abs() < 1e-12);
        }
        assert!((softplus(800.0) - 800.0).abs() < 1e-9);
    }

    #[test]
    fn predict_proba_applies_weights_and_intercept() {
        let m = model(vec![2.0, -1.0], 0.5);
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 3.0]];
        let p = m.predict_proba(&x).unwrap();
        assert!((p[0] - sigmoid(0.5)).abs() < 1e-12);
        assert!((p[1] - sigmoid(2.5)).abs() < 1e-12);
        assert!((p[2] - sigmoid(-2.5)).abs() < 1e-12);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let m = model(vec![1.0, 1.0], 0.0);
        let err = m.predict_proba(&array![[1.0, 2.0, 3.0]]).unwrap_err();
        assert_eq!(
            err,
            LogRegError::DimensionMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn validate_catches_length_mismatch() {
        let mut m = model(vec![1.0], 0.0);
        m.feature_dim = 2;
        assert!(m.validate().is_err());
    }
}
