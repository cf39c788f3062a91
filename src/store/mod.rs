//! Sidecar state persistence
//!
//! Each image gets a `<stem>.state.yml` file next to it holding the full
//! [`PipelineState`]. Saves are atomic: the snapshot is written to a
//! temporary file in the same directory and renamed over the target, so a
//! crash mid-save never leaves a truncated state file behind.

use crate::core::state::PipelineState;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state io error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid state file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to serialize state for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to persist state file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    #[error("image path has no file stem: {0}")]
    InvalidImagePath(PathBuf),
}

/// Loads and saves per-image pipeline state snapshots.
#[derive(Debug, Clone, Default)]
pub struct StateStore;

impl StateStore {
    pub fn new() -> Self {
        Self
    }

    /// Sidecar path for an image: `photo.jpg` -> `photo.state.yml`.
    pub fn state_path(&self, image: &Path) -> Result<PathBuf, StoreError> {
        let stem = image
            .file_stem()
            .ok_or_else(|| StoreError::InvalidImagePath(image.to_path_buf()))?;
        let mut name = stem.to_os_string();
        name.push(".state.yml");
        Ok(image.with_file_name(name))
    }

    pub fn exists(&self, image: &Path) -> Result<bool, StoreError> {
        Ok(self.state_path(image)?.exists())
    }

    /// Load the stored state for an image, or `None` when no sidecar exists.
    pub fn load(&self, image: &Path) -> Result<Option<PipelineState>, StoreError> {
        let path = self.state_path(image)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        let state: PipelineState = serde_yaml::from_str(&text).map_err(|e| StoreError::Parse {
            path: path.clone(),
            source: e,
        })?;
        // The sidecar is hand-editable; reject a step list that no longer
        // matches the fixed pipeline before anything indexes into it
        state.validate().map_err(|reason| StoreError::Malformed {
            path: path.clone(),
            reason,
        })?;
        debug!(path = %path.display(), "loaded pipeline state");
        Ok(Some(state))
    }

    /// Load the existing state or create a fresh one for the image.
    pub fn load_or_create(&self, image: &Path) -> Result<PipelineState, StoreError> {
        match self.load(image)? {
            Some(state) => Ok(state),
            None => Ok(PipelineState::new(image)),
        }
    }

    /// Atomically write the state next to its image.
    pub fn save(&self, state: &PipelineState) -> Result<(), StoreError> {
        let image = PathBuf::from(&state.image_path);
        let path = self.state_path(&image)?;
        let text = serde_yaml::to_string(state).map_err(|e| StoreError::Serialize {
            path: path.clone(),
            source: e,
        })?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(tmp.path(), text).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e,
        })?;
        tmp.persist(&path).map_err(|e| StoreError::Persist {
            path: path.clone(),
            source: e,
        })?;
        debug!(path = %path.display(), "saved pipeline state");
        Ok(())
    }

    /// Remove the sidecar file if present.
    pub fn delete(&self, image: &Path) -> Result<(), StoreError> {
        let path = self.state_path(image)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io { path, source: e }),
        }
    }
}
