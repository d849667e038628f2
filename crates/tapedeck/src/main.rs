//! Tapedeck: record, replay, and manage microphone voice memos from a
//! thin console front-end over the recording session manager.

mod config;
mod console;
mod error;
mod session_manager;
mod session_state;
#[cfg(test)]
mod tests;

pub(crate) use {
    error::{Result as SessionResult, SessionError},
    session_manager::SessionManager,
    session_state::{CaptureState, PlaybackState, SessionState},
};

use crate::config::Config;

use tapedeck_core::{CaptureController, PlaybackController, RecordingStore};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Application entry point.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("tapedeck=debug")
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let recordings_dir = match config.storage.resolve_recordings_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("Failed to resolve recordings directory: {:?}", e);
            std::process::exit(1);
        }
    };
    let store = RecordingStore::new(recordings_dir);

    let (finished_tx, finished_rx) = mpsc::channel(16);
    let playback = match PlaybackController::new(finished_tx) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to open playback device: {:?}", e);
            std::process::exit(1);
        }
    };
    let capture = CaptureController::new(config.audio.selected_device.clone());

    let mut manager = SessionManager::new(capture, playback, store);

    if let Err(e) = manager.request_permission().await {
        warn!(error = ?e, "Microphone unavailable; recording disabled until granted");
    }
    if let Err(e) = manager.refresh().await {
        // Surface the scan failure instead of silently starting empty.
        error!(error = ?e, "Initial catalog scan failed");
        println!("error: {}", e);
        println!("the catalog is empty until `refresh` succeeds");
    }

    if let Err(e) = console::run(manager, finished_rx).await {
        error!(error = ?e, "Console error");
        std::process::exit(1);
    }
}
