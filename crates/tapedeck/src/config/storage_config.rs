use crate::{
    SessionError, SessionResult,
    config::{APPLICATION, ORGANIZATION, QUALIFIER},
};

use std::{panic::Location, path::PathBuf};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Recording storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Recordings directory override (None = platform data dir).
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the recordings directory: the configured override, or
    /// `recordings/` under the platform data directory.
    #[track_caller]
    pub fn resolve_recordings_dir(&self) -> SessionResult<PathBuf> {
        if let Some(dir) = &self.recordings_dir {
            return Ok(dir.clone());
        }

        let proj_dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| {
            SessionError::Config {
                reason: "Failed to get data directory".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        Ok(proj_dirs.data_dir().join("recordings"))
    }
}
