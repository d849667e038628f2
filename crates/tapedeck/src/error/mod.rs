use tapedeck_core::CoreError;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Application-level errors for the tapedeck binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Capture, playback, or store error from tapedeck-core.
    #[error("Audio error: {source} {location}")]
    Core {
        /// The underlying core error.
        #[source]
        source: CoreError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Command issued while the session snapshot forbids it. Always
    /// recoverable by re-checking the snapshot.
    #[error("{command} rejected: {reason} {location}")]
    InvalidState {
        /// The rejected command.
        command: &'static str,
        /// The precondition that does not hold.
        reason: &'static str,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading or saving error.
    #[error("Configuration error: {reason} {location}")]
    Config {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from the console front-end.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

// Manual From<CoreError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<CoreError> for SessionError {
    #[track_caller]
    fn from(source: CoreError) -> Self {
        SessionError::Core {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for SessionError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        SessionError::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `SessionError`.
pub type Result<T> = StdResult<T, SessionError>;
