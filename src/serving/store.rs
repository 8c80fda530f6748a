use std::sync::Arc;

use tracing::debug;

use crate::artifact::{self, ArtifactError, ArtifactLocation, TrainedArtifact};

/// Source of the artifact used to answer requests.
#[derive(Debug, Clone)]
pub enum ArtifactStore {
    /// Loaded once at startup.
    Cached(Arc<TrainedArtifact>),
    /// Read from storage on every request.
    Reload(ArtifactLocation),
}

impl ArtifactStore {
    /// Build a store; cached stores load eagerly so a bad artifact fails startup.
    pub fn open(location: &ArtifactLocation, cache: bool) -> Result<Self, ArtifactError> {
        if cache {
            let loaded = artifact::load(location)?;
            Ok(ArtifactStore::Cached(Arc::new(loaded)))
        } else {
            Ok(ArtifactStore::Reload(location.clone()))
        }
    }

    pub fn get(&self) -> Result<Arc<TrainedArtifact>, ArtifactError> {
        match self {
            ArtifactStore::Cached(artifact) => Ok(Arc::clone(artifact)),
            ArtifactStore::Reload(location) => {
                debug!(artifact = %location, "Reloading artifact");
                artifact::load(location).map(Arc::new)
            }
        }
    }
}
