//! TOML configuration shared by the trainer, the predictor and the server.
//!
//! Every field has a default, so an empty file (or no file at all) describes the churn dataset
//! pipeline with its original hyperparameters.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::ArtifactLocation;
use crate::schema::FeatureSchema;
use crate::serving::ErrorStatusMode;
use crate::training::FinalFit;

mod defaults;
use defaults::*;

/// Config file looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "churnpal.toml";

/// Errors that may occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Parsed values are out of range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Whole-application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schema: FeatureSchema,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub serving: ServingSettings,
}

/// Knobs of the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// CSV file with a header row.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Where the fitted artifact is written.
    #[serde(default = "default_artifact")]
    pub artifact: ArtifactLocation,
    /// Inverse regularization strength.
    #[serde(default = "default_c")]
    pub c: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_tol")]
    pub tol: f64,
    #[serde(default = "default_n_splits")]
    pub n_splits: usize,
    /// Seed for every split and fold shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Share of all rows held out as the test partition.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Share of the full-train partition used for validation.
    #[serde(default = "default_val_fraction")]
    pub val_fraction: f64,
    #[serde(default = "default_target_column")]
    pub target_column: String,
    #[serde(default = "default_positive_label")]
    pub positive_label: String,
    /// Numerical attributes whose unparsable cells become zero.
    #[serde(default = "default_coerce_numeric")]
    pub coerce_numeric: Vec<String>,
    #[serde(default)]
    pub final_fit: FinalFit,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            artifact: default_artifact(),
            c: default_c(),
            max_iter: default_max_iter(),
            tol: default_tol(),
            n_splits: default_n_splits(),
            seed: default_seed(),
            test_fraction: default_test_fraction(),
            val_fraction: default_val_fraction(),
            target_column: default_target_column(),
            positive_label: default_positive_label(),
            coerce_numeric: default_coerce_numeric(),
            final_fit: FinalFit::default(),
        }
    }
}

/// Knobs of the HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_route")]
    pub route: String,
    #[serde(default = "default_artifact")]
    pub artifact: ArtifactLocation,
    /// Load the artifact once at startup instead of on every request.
    #[serde(default)]
    pub cache_artifact: bool,
    #[serde(default)]
    pub error_status: ErrorStatusMode,
}

impl Default for ServingSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            route: default_route(),
            artifact: default_artifact(),
            cache_artifact: false,
            error_status: ErrorStatusMode::default(),
        }
    }
}

impl AppConfig {
    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schema
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        let t = &self.training;
        if !t.c.is_finite() || t.c <= 0.0 {
            return Err(ConfigError::Invalid(format!("training.c must be > 0, got {}", t.c)));
        }
        if t.max_iter == 0 {
            return Err(ConfigError::Invalid("training.max_iter must be > 0".to_string()));
        }
        if !t.tol.is_finite() || t.tol <= 0.0 {
            return Err(ConfigError::Invalid(format!("training.tol must be > 0, got {}", t.tol)));
        }
        if t.n_splits < 2 {
            return Err(ConfigError::Invalid(format!(
                "training.n_splits must be >= 2, got {}",
                t.n_splits
            )));
        }
        for (name, value) in [
            ("training.test_fraction", t.test_fraction),
            ("training.val_fraction", t.val_fraction),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within (0, 1), got {value}"
                )));
            }
        }
        for name in &t.coerce_numeric {
            if !self.schema.numerical.contains(name) {
                return Err(ConfigError::Invalid(format!(
                    "training.coerce_numeric names '{name}', which is not a numerical attribute"
                )));
            }
        }
        if !self.serving.route.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "serving.route must start with '/', got '{}'",
                self.serving.route
            )));
        }
        Ok(())
    }
}

/// Load and validate a config file.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `explicit`, else `./churnpal.toml` when present, else defaults.
///
/// Returns the path that was used, if any.
pub fn load_or_default(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
        return Ok((load(path)?, Some(path.to_path_buf())));
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        let config = load(&local)?;
        return Ok((config, Some(local)));
    }
    Ok((AppConfig::default(), None))
}
