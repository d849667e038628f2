use crate::{CoreResult, Recording};

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sent on the completion channel when a playback stream reaches natural
/// end-of-stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackFinished {
    /// Path of the clip whose stream ended.
    pub path: PathBuf,
    /// Decoded clip length.
    pub duration: Duration,
}

/// Microphone capture backend.
///
/// The production implementation is [`CaptureController`]; the session
/// state machine is generic over this trait so it can run against
/// in-memory fakes in tests.
///
/// [`CaptureController`]: crate::CaptureController
#[async_trait::async_trait(?Send)]
pub trait CaptureBackend {
    /// Open the capture device, requesting microphone access.
    /// Idempotent once the device is open.
    async fn initialize(&mut self) -> CoreResult<()>;

    /// Begin capturing a new take destined for `path`.
    async fn start(&mut self, path: &Path) -> CoreResult<()>;

    /// Finalize the in-flight take and return the completed recording.
    async fn stop(&mut self) -> CoreResult<Recording>;

    /// Release the capture device. An in-flight take is discarded.
    async fn teardown(&mut self);
}

/// Playback backend for persisted recordings.
///
/// The production implementation is [`PlaybackController`].
///
/// [`PlaybackController`]: crate::PlaybackController
#[async_trait::async_trait(?Send)]
pub trait PlaybackBackend {
    /// Start streaming `recording`, halting any stream already active.
    /// Returns the decoded clip length.
    async fn play(&mut self, recording: &Recording) -> CoreResult<Duration>;

    /// Halt the active stream. Returns `true` when this call (rather
    /// than natural completion) retired it. No-op when idle.
    async fn stop(&mut self) -> CoreResult<bool>;

    /// Release the playback device, halting any active stream.
    async fn teardown(&mut self);
}
