//! The composing state machine: capture, playback, and the store behind
//! one command surface.
//!
//! Commands take `&mut self`, so exactly one command mutates the session
//! at a time and transitions apply in issue order. The presentation
//! layer observes cloned snapshots through a watch channel and never
//! holds a mutable handle.

use crate::{CaptureState, PlaybackState, SessionError, SessionResult, SessionState};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use error_location::ErrorLocation;
use tapedeck_core::{
    CaptureBackend, CoreError, PlaybackBackend, PlaybackFinished, Recording, RecordingStore,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Single source of truth for the recording session.
///
/// Generic over the capture and playback backends so the state machine
/// runs against in-memory fakes in tests; production wires in
/// [`CaptureController`] and [`PlaybackController`].
///
/// [`CaptureController`]: tapedeck_core::CaptureController
/// [`PlaybackController`]: tapedeck_core::PlaybackController
pub struct SessionManager<C, P> {
    capture: C,
    playback: P,
    store: RecordingStore,
    state: SessionState,
    snapshot_tx: watch::Sender<SessionState>,
    /// Length of the clip being streamed, stamped onto the catalog
    /// entry when the stream retires.
    active_duration: Option<Duration>,
}

impl<C: CaptureBackend, P: PlaybackBackend> SessionManager<C, P> {
    /// Compose a session over the given backends and store.
    ///
    /// The caller keeps the receiving half of the playback completion
    /// channel and feeds events back through [`complete_playback`].
    ///
    /// [`complete_playback`]: SessionManager::complete_playback
    pub fn new(capture: C, playback: P, store: RecordingStore) -> Self {
        let state = SessionState::initial();
        let (snapshot_tx, _) = watch::channel(state.clone());

        Self {
            capture,
            playback,
            store,
            state,
            snapshot_tx,
            active_duration: None,
        }
    }

    /// Clone of the current session snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// Subscribe to snapshot changes; one message per committed delta.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.state.clone());
    }

    /// Request microphone access by initializing the capture backend.
    ///
    /// Idempotent while granted. A failed re-request clears the granted
    /// flag (the device may have gone away since).
    #[instrument(skip(self))]
    pub async fn request_permission(&mut self) -> SessionResult<()> {
        match self.capture.initialize().await {
            Ok(()) => {
                if !self.state.permission_granted {
                    self.state.permission_granted = true;
                    self.publish();
                }
                info!("Microphone access granted");
                Ok(())
            }
            Err(e) => {
                if self.state.permission_granted {
                    self.state.permission_granted = false;
                    self.publish();
                }
                Err(e.into())
            }
        }
    }

    /// One press = start a take, next press = finish it.
    ///
    /// Starting while a clip is playing force-stops the clip first; that
    /// half commits (with its own snapshot) even if the capture start
    /// then fails, since a stop is always safe to apply.
    #[instrument(skip(self))]
    pub async fn toggle_recording(&mut self) -> SessionResult<()> {
        if self.state.is_recording() {
            return self.finish_take().await;
        }

        if !self.state.permission_granted {
            return Err(SessionError::InvalidState {
                command: "toggle_recording",
                reason: "microphone permission not granted",
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.state.playing().is_some() {
            self.stop_playback().await?;
        }

        let path = self.allocate_fresh_path().await?;
        self.capture.start(&path).await?;

        let session_id = Uuid::new_v4();
        self.state.capture = CaptureState::Recording {
            started_at: Instant::now(),
            session_id,
        };
        self.publish();

        info!(session_id = %session_id, path = ?path, "Recording started");

        Ok(())
    }

    /// Toggle playback of a catalog entry: play it, or stop it if it is
    /// already the active target.
    ///
    /// # Errors
    ///
    /// `InvalidState` while a take is in flight (recording takes
    /// priority and must be stopped explicitly first) or when
    /// `recording` is not in the catalog.
    #[instrument(skip(self, recording), fields(path = ?recording.path))]
    pub async fn toggle_playback(&mut self, recording: &Recording) -> SessionResult<()> {
        let is_active_target = self
            .state
            .playing()
            .is_some_and(|active| active.same_clip(recording));
        if is_active_target {
            return self.stop_playback().await;
        }

        if self.state.is_recording() {
            return Err(SessionError::InvalidState {
                command: "toggle_playback",
                reason: "recording in progress",
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let Some(entry) = self
            .state
            .recordings
            .iter()
            .find(|r| r.same_clip(recording))
            .cloned()
        else {
            return Err(SessionError::InvalidState {
                command: "toggle_playback",
                reason: "recording not in catalog",
                location: ErrorLocation::from(Location::caller()),
            });
        };

        // Single-active-stream: retire the current clip first, with its
        // own committed snapshot.
        if self.state.playing().is_some() {
            self.stop_playback().await?;
        }

        let duration = self.playback.play(&entry).await?;
        self.active_duration = Some(duration);
        self.state.playback = PlaybackState::Playing(entry);
        self.publish();

        info!(duration_ms = duration.as_millis(), "Playback started");

        Ok(())
    }

    /// Delete a clip: stop it first if it is the active playback target,
    /// remove the file, then drop the catalog entry. Idempotent.
    #[instrument(skip(self, recording), fields(path = ?recording.path))]
    pub async fn delete_recording(&mut self, recording: &Recording) -> SessionResult<()> {
        let is_active_target = self
            .state
            .playing()
            .is_some_and(|active| active.same_clip(recording));
        if is_active_target {
            // Never delete a file that is still open for streaming.
            self.stop_playback().await?;
        }

        self.store.delete(&recording.path).await?;

        let before = self.state.recordings.len();
        self.state.recordings.retain(|r| !r.same_clip(recording));
        if self.state.recordings.len() != before {
            self.publish();
            info!("Recording deleted");
        } else {
            debug!("Recording already absent from catalog");
        }

        Ok(())
    }

    /// Rescan the store and replace the catalog, preserving capture and
    /// playback state and any durations already learned.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> SessionResult<()> {
        let mut recordings = self.store.list().await?;

        for entry in &mut recordings {
            if let Some(known) = self.state.recordings.iter().find(|r| r.same_clip(entry)) {
                entry.duration = known.duration;
            }
        }

        // The active target streams from memory even if its file was
        // removed externally; keep its catalog entry until it retires.
        if let Some(active) = self.state.playing() {
            if !recordings.iter().any(|r| r.same_clip(active)) {
                warn!(path = ?active.path, "Active playback target missing from rescan, keeping entry");
                recordings.push(active.clone());
            }
        }

        self.state.recordings = recordings;
        self.publish();

        info!(count = self.state.recordings.len(), "Catalog refreshed");

        Ok(())
    }

    /// Apply a natural end-of-stream notification from the playback
    /// backend. Stale events (the clip was already stopped explicitly)
    /// are ignored.
    #[instrument(skip(self, event), fields(path = ?event.path))]
    pub async fn complete_playback(&mut self, event: PlaybackFinished) -> SessionResult<()> {
        let is_active = self
            .state
            .playing()
            .is_some_and(|active| active.path == event.path);
        if !is_active {
            debug!("Stale completion event ignored");
            return Ok(());
        }

        // The stream has drained but the native handle is still open;
        // retire it before committing the transition.
        let _ = self.playback.stop().await?;

        self.state.playback = PlaybackState::Idle;
        self.active_duration = None;
        self.stamp_duration(&event.path, event.duration);
        self.publish();

        info!("Playback completed");

        Ok(())
    }

    /// Tear the session down, releasing both native handles.
    ///
    /// An in-flight take is finalized into the catalog first; active
    /// playback is stopped with normal semantics. Teardown failures are
    /// logged, not propagated, so every handle still gets released.
    #[instrument(skip(self))]
    pub async fn shutdown(mut self) {
        if self.state.is_recording() {
            if let Err(e) = self.finish_take().await {
                warn!(error = ?e, "Failed to finalize take during shutdown");
            }
        }
        if self.state.playing().is_some() {
            if let Err(e) = self.stop_playback().await {
                warn!(error = ?e, "Failed to stop playback during shutdown");
            }
        }

        self.capture.teardown().await;
        self.playback.teardown().await;

        info!("Session shut down");
    }

    async fn finish_take(&mut self) -> SessionResult<()> {
        let (started_at, session_id) = match self.state.capture {
            CaptureState::Recording {
                started_at,
                session_id,
            } => (started_at, session_id),
            CaptureState::Idle => {
                return Err(SessionError::InvalidState {
                    command: "toggle_recording",
                    reason: "no take in flight",
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        match self.capture.stop().await {
            Ok(recording) => {
                self.state.capture = CaptureState::Idle;
                if !self.state.recordings.iter().any(|r| r.same_clip(&recording)) {
                    self.state.recordings.push(recording.clone());
                }
                self.publish();

                info!(
                    session_id = %session_id,
                    take_ms = started_at.elapsed().as_millis(),
                    path = ?recording.path,
                    "Recording finished"
                );

                Ok(())
            }
            Err(e) => {
                // The stream is already released, so the take cannot
                // continue; any partial file stays on disk for a later
                // refresh/delete.
                self.state.capture = CaptureState::Idle;
                self.publish();

                warn!(session_id = %session_id, "Take failed to finalize");

                Err(e.into())
            }
        }
    }

    async fn stop_playback(&mut self) -> SessionResult<()> {
        let explicit = self.playback.stop().await?;

        let PlaybackState::Playing(active) =
            std::mem::replace(&mut self.state.playback, PlaybackState::Idle)
        else {
            // Duplicate stop tolerated.
            return Ok(());
        };

        if let Some(duration) = self.active_duration.take() {
            self.stamp_duration(&active.path, duration);
        }
        self.publish();

        debug!(path = ?active.path, explicit, "Playback retired");

        Ok(())
    }

    async fn allocate_fresh_path(&mut self) -> SessionResult<PathBuf> {
        let timestamp = epoch_millis();

        match self.store.allocate(timestamp).await {
            Ok(path) => Ok(path),
            Err(CoreError::StoreConflict { .. }) => {
                // Same-millisecond collision: one retry with a bumped
                // timestamp keeps the sequence monotonic.
                debug!(timestamp, "Allocation collided, retrying");
                Ok(self.store.allocate(timestamp + 1).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn stamp_duration(&mut self, path: &Path, duration: Duration) {
        if let Some(entry) = self.state.recordings.iter_mut().find(|r| r.path == path) {
            if entry.duration.is_none() {
                entry.duration = Some(duration);
            }
        }
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
