//! HTTP endpoint answering one churn prediction per POST.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::ArtifactError;

pub mod handler;
mod server;
pub mod store;

pub use handler::{
    MalformedInputError, PROBABILITY_FIELD, Reply, RequestError, handle_predict, parse_record,
};
pub use server::PredictServer;
pub use store::ArtifactStore;

/// How application errors map onto HTTP status codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatusMode {
    /// 400 malformed body, 422 schema violation, 500 unavailable artifact.
    #[default]
    Distinct,
    /// 400 for every application error.
    Uniform,
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}
