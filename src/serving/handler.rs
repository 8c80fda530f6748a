//! Request-to-reply logic of the predict route, free of any transport.

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

use super::ErrorStatusMode;
use super::store::ArtifactStore;
use crate::artifact::ArtifactError;
use crate::dataset::normalize_token;
use crate::predictor::{self, PredictError};
use crate::record::{CustomerRecord, FeatureValue};
use crate::schema::SchemaError;

/// Response field holding the churn probability.
pub const PROBABILITY_FIELD: &str = "probability";

/// Largest request body accepted.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// The request body is not a record.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed request body: {reason}")]
pub struct MalformedInputError {
    pub reason: String,
}

impl MalformedInputError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Application-level failures of a predict call.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Malformed(#[from] MalformedInputError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("model unavailable: {0}")]
    Artifact(#[from] ArtifactError),
}

impl From<PredictError> for RequestError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Schema(err) => RequestError::Schema(err),
            PredictError::Model(err) => RequestError::Artifact(ArtifactError::Model(err)),
            PredictError::Empty => RequestError::Artifact(ArtifactError::Mismatch(err.to_string())),
        }
    }
}

impl RequestError {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Malformed(_) => "malformed_input",
            RequestError::Schema(_) => "schema_error",
            RequestError::Artifact(_) => "artifact_unavailable",
        }
    }

    pub fn status(&self, mode: ErrorStatusMode) -> u16 {
        match (mode, self) {
            (ErrorStatusMode::Uniform, _) => 400,
            (ErrorStatusMode::Distinct, RequestError::Malformed(_)) => 400,
            (ErrorStatusMode::Distinct, RequestError::Schema(_)) => 422,
            (ErrorStatusMode::Distinct, RequestError::Artifact(_)) => 500,
        }
    }
}

/// Status code and JSON body to send back.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn error(err: &RequestError, mode: ErrorStatusMode) -> Self {
        Self {
            status: err.status(mode),
            body: json!({ "error": err.to_string(), "kind": err.kind() }),
        }
    }
}

/// Parse a JSON object of scalar values. Text values are normalized like training data.
pub fn parse_record(body: &[u8]) -> Result<CustomerRecord, MalformedInputError> {
    if body.len() > MAX_BODY_BYTES {
        return Err(MalformedInputError::new(format!(
            "body exceeds {MAX_BODY_BYTES} bytes"
        )));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| MalformedInputError::new(format!("invalid JSON: {err}")))?;
    let Value::Object(map) = value else {
        return Err(MalformedInputError::new("expected a JSON object"));
    };
    let mut record = CustomerRecord::new();
    for (attribute, value) in map {
        let value = match value {
            Value::String(text) => FeatureValue::Text(normalize_token(&text)),
            Value::Number(number) => match number.as_f64() {
                Some(number) => FeatureValue::Number(number),
                None => {
                    return Err(MalformedInputError::new(format!(
                        "attribute '{attribute}' is not a representable number"
                    )));
                }
            },
            other => {
                return Err(MalformedInputError::new(format!(
                    "attribute '{attribute}' must be a string or number, got {}",
                    json_type(&other)
                )));
            }
        };
        record.insert(attribute, value);
    }
    Ok(record)
}

/// Score one request body.
pub fn handle_predict(body: &[u8], store: &ArtifactStore, mode: ErrorStatusMode) -> Reply {
    match predict_body(body, store) {
        Ok(probability) => Reply {
            status: 200,
            body: json!({ PROBABILITY_FIELD: probability }),
        },
        Err(err) => {
            match &err {
                RequestError::Artifact(_) => error!("Predict request failed: {err}"),
                _ => warn!("Rejected predict request: {err}"),
            }
            Reply::error(&err, mode)
        }
    }
}

fn predict_body(body: &[u8], store: &ArtifactStore) -> Result<f64, RequestError> {
    let record = parse_record(body)?;
    let artifact = store.get()?;
    record.validate(artifact.schema())?;
    Ok(predictor::predict_one(&record, &artifact)?)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
