//! Tapedeck Core Library
//!
//! Microphone capture, WAV playback, and the filesystem-backed recording
//! catalog behind the tapedeck session manager. Built on CPAL and Hound.
//!
//! # Example
//!
//! ```no_run
//! use tapedeck_core::{CaptureBackend, CaptureController, CoreResult, RecordingStore};
//!
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let store = RecordingStore::new("recordings".into());
//!     let mut capture = CaptureController::new(None);
//!
//!     capture.initialize().await?;
//!     let path = store.allocate(1_700_000_000_000).await?;
//!     capture.start(&path).await?;
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     let recording = capture.stop().await?;
//!
//!     println!("Recorded: {}", recording.display_name);
//!     Ok(())
//! }
//! ```

mod audio;
mod error;
mod recording;
mod store;

pub use {
    audio::{
        CaptureBackend, CaptureController, PlaybackBackend, PlaybackController, PlaybackFinished,
    },
    error::{CoreError, Result as CoreResult},
    recording::Recording,
    store::{RECORDING_EXT, RecordingStore},
};

#[cfg(test)]
mod tests;
