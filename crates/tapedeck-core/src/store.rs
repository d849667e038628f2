//! Filesystem-backed catalog of recordings.
//!
//! One fixed directory holds every clip; the directory listing IS the
//! catalog. There is no metadata sidecar: filenames embed the creation
//! timestamp, so a plain name sort yields creation order.

use crate::{CoreError, CoreResult, Recording};

use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};

/// File extension of the fixed on-disk codec.
pub const RECORDING_EXT: &str = "wav";

const RECORDING_PREFIX: &str = "recording_";

/// Catalog of recordings rooted at a fixed directory.
pub struct RecordingStore {
    root: PathBuf,
}

impl RecordingStore {
    /// Create a store rooted at `root`. The directory is created lazily
    /// on the first `allocate`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The recordings directory this store scans.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the recordings directory and return catalog entries in
    /// creation order (oldest first).
    ///
    /// A missing directory is an empty catalog, not an error. Filenames
    /// that do not follow the `recording_<epochMillis>.wav` convention
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the directory exists but cannot be
    /// read.
    #[instrument(skip(self))]
    pub async fn list(&self) -> CoreResult<Vec<Recording>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = ?self.root, "Recordings directory missing, catalog is empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(CoreError::StoreUnavailable {
                    path: self.root.clone(),
                    source: e,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let mut names = Vec::new();
        loop {
            let entry = dir
                .next_entry()
                .await
                .map_err(|e| CoreError::StoreUnavailable {
                    path: self.root.clone(),
                    source: e,
                    location: ErrorLocation::from(Location::caller()),
                })?;
            let Some(entry) = entry else { break };

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if parse_timestamp(name).is_some() {
                names.push(name.to_owned());
            }
        }

        // The embedded timestamp is the whole variable part of the name,
        // so lexicographic order is creation order for same-width stamps.
        names.sort();

        let recordings: Vec<Recording> = names
            .into_iter()
            .map(|name| Recording::new(self.root.join(name)))
            .collect();

        info!(count = recordings.len(), "Catalog scanned");

        Ok(recordings)
    }

    /// Derive a fresh clip path from an epoch-milliseconds timestamp,
    /// creating the recordings directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreConflict` if a file already exists at the derived
    /// path (same-millisecond collision; retry with a newer timestamp)
    /// and `StoreUnavailable` if the directory cannot be created or
    /// probed.
    #[instrument(skip(self))]
    pub async fn allocate(&self, timestamp_ms: u64) -> CoreResult<PathBuf> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CoreError::StoreUnavailable {
                path: self.root.clone(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let path = self.root.join(file_name_for(timestamp_ms));

        match tokio::fs::try_exists(&path).await {
            Ok(true) => Err(CoreError::StoreConflict {
                path,
                location: ErrorLocation::from(Location::caller()),
            }),
            Ok(false) => {
                debug!(path = ?path, "Recording path allocated");
                Ok(path)
            }
            Err(e) => Err(CoreError::StoreUnavailable {
                path,
                source: e,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Remove a clip file. Idempotent: an already-absent file is Ok.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` for any removal failure other than
    /// the file being absent.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &Path) -> CoreResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!(path = ?path, "Recording deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?path, "Recording already absent");
                Ok(())
            }
            Err(e) => Err(CoreError::StoreUnavailable {
                path: path.to_path_buf(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

fn file_name_for(timestamp_ms: u64) -> String {
    format!("{RECORDING_PREFIX}{timestamp_ms}.{RECORDING_EXT}")
}

/// Parse the embedded epoch-milliseconds timestamp out of a catalog
/// filename, or `None` for names outside the convention.
pub(crate) fn parse_timestamp(file_name: &str) -> Option<u64> {
    let stem = file_name.strip_prefix(RECORDING_PREFIX)?;
    let digits = stem.strip_suffix(RECORDING_EXT)?.strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
