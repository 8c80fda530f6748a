//! Customer churn prediction: schema, encoder, logistic regression, training and serving.

/// Per-user application directories (logs).
pub mod app_dirs;
/// Persisted encoder/classifier pairs.
pub mod artifact;
/// TOML configuration with defaults.
pub mod config;
/// CSV loading and cleaning of labeled customer rows.
pub mod dataset;
/// Blocking HTTP client used by the prediction CLI.
pub mod http_client;
/// Tracing setup for the binaries.
pub mod logging;
/// Encoder, classifier and evaluation metrics.
pub mod ml;
/// Churn probabilities for already-validated records.
pub mod predictor;
/// Customer records as attribute/value maps.
pub mod record;
/// Feature schema: which attributes exist and how they are encoded.
pub mod schema;
/// The HTTP predict endpoint.
pub mod serving;
/// Cross-validated training pipeline.
pub mod training;
