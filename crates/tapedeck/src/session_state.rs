use std::time::Instant;

use tapedeck_core::Recording;
use uuid::Uuid;

/// Capture half of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Not currently recording.
    Idle,
    /// Currently recording audio.
    Recording {
        /// When the take started.
        started_at: Instant,
        /// Unique take ID for log correlation.
        session_id: Uuid,
    },
}

/// Playback half of the session state.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    /// No active stream.
    Idle,
    /// Streaming the contained catalog entry.
    Playing(Recording),
}

/// Immutable snapshot of the whole session.
///
/// One snapshot is published on the watch channel for every committed
/// state change; the presentation layer never receives a mutable handle.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Capture half. Mutually exclusive with active playback.
    pub capture: CaptureState,
    /// Playback half. Mutually exclusive with an active take.
    pub playback: PlaybackState,
    /// Catalog, insertion-ordered, newest appended last. No two entries
    /// share a path.
    pub recordings: Vec<Recording>,
    /// Whether microphone access has been granted this session.
    pub permission_granted: bool,
}

impl SessionState {
    pub(crate) fn initial() -> Self {
        Self {
            capture: CaptureState::Idle,
            playback: PlaybackState::Idle,
            recordings: Vec::new(),
            permission_granted: false,
        }
    }

    /// True while a take is in flight.
    pub fn is_recording(&self) -> bool {
        matches!(self.capture, CaptureState::Recording { .. })
    }

    /// The active playback target, if any.
    pub fn playing(&self) -> Option<&Recording> {
        match &self.playback {
            PlaybackState::Playing(recording) => Some(recording),
            PlaybackState::Idle => None,
        }
    }
}
