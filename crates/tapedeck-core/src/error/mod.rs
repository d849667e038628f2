use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

/// Capture, playback, and store errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Microphone access is unavailable: the OS refused it or no input
    /// device exists. Capture stays unusable until re-initialized.
    #[error("Microphone unavailable: {reason} {location}")]
    PermissionDenied {
        /// Why the capture device could not be opened.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Operation issued while the controller is in the wrong state.
    #[error("Cannot {operation} while {state} {location}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state that forbids it.
        state: &'static str,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Native capture or WAV encoding failure mid-operation.
    #[error("Capture I/O error: {reason} {location}")]
    CaptureIo {
        /// Description of the capture failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Native playback or WAV decoding failure mid-operation.
    #[error("Playback I/O error: {reason} {location}")]
    PlaybackIo {
        /// Description of the playback failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The recordings directory could not be read or written.
    #[error("Recording store unavailable at {path:?}: {source} {location}")]
    StoreUnavailable {
        /// The path the store failed to access.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A freshly allocated recording path already exists on disk.
    /// Recoverable by retrying with a newer timestamp.
    #[error("Recording path already exists: {path:?} {location}")]
    StoreConflict {
        /// The colliding path.
        path: PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
