//! Persisted (encoder, classifier) pairs.
//!
//! The classifier's weights only make sense next to the encoder that produced its columns, so the
//! two halves are always written and read together. Both halves carry the encoder fingerprint; a
//! pair whose fingerprints or widths disagree is refused at load time.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::encoder::FeatureEncoder;
use crate::ml::logreg::{LogRegError, LogRegModel};
use crate::schema::FeatureSchema;

/// Current on-disk artifact layout.
pub const ARTIFACT_FORMAT_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unsupported artifact format_version {0} (expected {ARTIFACT_FORMAT_VERSION})")]
    UnsupportedVersion(i64),
    #[error("encoder and model do not belong together: {0}")]
    Mismatch(String),
    #[error(transparent)]
    Model(#[from] LogRegError),
}

/// Where an artifact lives: one bundle file, or two files written as a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactLocation {
    Split {
        encoder_path: PathBuf,
        model_path: PathBuf,
    },
    Bundle {
        path: PathBuf,
    },
}

impl ArtifactLocation {
    pub fn bundle(path: impl Into<PathBuf>) -> Self {
        ArtifactLocation::Bundle { path: path.into() }
    }
}

impl std::fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactLocation::Bundle { path } => write!(f, "{}", path.display()),
            ArtifactLocation::Split {
                encoder_path,
                model_path,
            } => write!(f, "{} + {}", encoder_path.display(), model_path.display()),
        }
    }
}

/// A fitted encoder and the classifier trained on its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub format_version: i64,
    pub encoder: FeatureEncoder,
    pub model: LogRegModel,
}

impl TrainedArtifact {
    /// Pair an encoder with its model, stamping the model with the encoder fingerprint.
    pub fn new(encoder: FeatureEncoder, mut model: LogRegModel) -> Result<Self, ArtifactError> {
        model.encoder_fingerprint = Some(encoder.fingerprint());
        let artifact = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            encoder,
            model,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.encoder.schema()
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(self.format_version));
        }
        self.model.validate()?;
        if self.model.feature_dim != self.encoder.width() {
            return Err(ArtifactError::Mismatch(format!(
                "model expects {} features, encoder produces {}",
                self.model.feature_dim,
                self.encoder.width()
            )));
        }
        let expected = self.encoder.fingerprint();
        match self.model.encoder_fingerprint.as_deref() {
            Some(found) if found == expected => Ok(()),
            Some(found) => Err(ArtifactError::Mismatch(format!(
                "model fingerprint {found} != encoder fingerprint {expected}"
            ))),
            None => Err(ArtifactError::Mismatch(
                "model carries no encoder fingerprint".to_string(),
            )),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct EncoderHalf {
    format_version: i64,
    fingerprint: String,
    encoder: FeatureEncoder,
}

#[derive(Serialize, Deserialize)]
struct ModelHalf {
    format_version: i64,
    model: LogRegModel,
}

/// Write an artifact; each file is replaced atomically.
pub fn save(artifact: &TrainedArtifact, location: &ArtifactLocation) -> Result<(), ArtifactError> {
    artifact.validate()?;
    match location {
        ArtifactLocation::Bundle { path } => {
            write_atomic(path, &serde_json::to_vec_pretty(artifact)?)
        }
        ArtifactLocation::Split {
            encoder_path,
            model_path,
        } => {
            let encoder = EncoderHalf {
                format_version: artifact.format_version,
                fingerprint: artifact.encoder.fingerprint(),
                encoder: artifact.encoder.clone(),
            };
            let model = ModelHalf {
                format_version: artifact.format_version,
                model: artifact.model.clone(),
            };
            write_atomic(encoder_path, &serde_json::to_vec_pretty(&encoder)?)?;
            write_atomic(model_path, &serde_json::to_vec_pretty(&model)?)
        }
    }
}

/// Read and validate an artifact.
pub fn load(location: &ArtifactLocation) -> Result<TrainedArtifact, ArtifactError> {
    let artifact = match location {
        ArtifactLocation::Bundle { path } => read_json::<TrainedArtifact>(path)?,
        ArtifactLocation::Split {
            encoder_path,
            model_path,
        } => {
            let encoder: EncoderHalf = read_json(encoder_path)?;
            let model: ModelHalf = read_json(model_path)?;
            if encoder.format_version != model.format_version {
                return Err(ArtifactError::Mismatch(format!(
                    "encoder format_version {} != model format_version {}",
                    encoder.format_version, model.format_version
                )));
            }
            if encoder.fingerprint != encoder.encoder.fingerprint() {
                return Err(ArtifactError::Mismatch(format!(
                    "{} was edited after it was written",
                    encoder_path.display()
                )));
            }
            TrainedArtifact {
                format_version: encoder.format_version,
                encoder: encoder.encoder,
                model: model.model,
            }
        }
    };
    artifact.validate()?;
    Ok(artifact)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let write_err = |source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
