mod backend;
pub(crate) mod capture;
pub(crate) mod playback;

pub use {
    backend::{CaptureBackend, PlaybackBackend, PlaybackFinished},
    capture::CaptureController,
    playback::PlaybackController,
};
