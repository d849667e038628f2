use crate::{CoreError, CoreResult, PlaybackBackend, PlaybackFinished, Recording};

use std::{
    panic::Location,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use hound::WavReader;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

struct ActiveStream {
    stream: Stream,
    recording: Recording,
    /// One-shot completion flag. Whoever flips it false→true owns the
    /// completion: the callback sends the finished event, an explicit
    /// `stop()` reports `true` to its caller. Never both.
    retired: Arc<AtomicBool>,
}

/// Playback controller: Ready ⇄ Playing, one active stream at most.
///
/// Natural end-of-stream is reported exactly once per `play` on the
/// completion channel handed to [`PlaybackController::new`].
pub struct PlaybackController {
    device: Device,
    finished_tx: mpsc::Sender<PlaybackFinished>,
    active: Option<ActiveStream>,
}

impl PlaybackController {
    /// Acquire the default output device.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackIo` if the host has no output device.
    #[track_caller]
    #[instrument(skip(finished_tx))]
    pub fn new(finished_tx: mpsc::Sender<PlaybackFinished>) -> CoreResult<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| CoreError::PlaybackIo {
                reason: "No output device available".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(
            device = %device.name().unwrap_or_default(),
            "Playback device opened"
        );

        Ok(Self {
            device,
            finished_tx,
            active: None,
        })
    }

    #[instrument(skip(self, recording), fields(path = ?recording.path))]
    fn start_stream(&mut self, recording: &Recording) -> CoreResult<Duration> {
        // Single-active-stream policy: retire whatever is playing first.
        self.halt_active();

        let clip = decode_wav(&recording.path)?;
        let duration = clip.duration;

        let config = StreamConfig {
            channels: clip.channels,
            sample_rate: clip.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let retired = Arc::new(AtomicBool::new(false));
        let cb_retired = Arc::clone(&retired);
        let tx = self.finished_tx.clone();
        let finished_path = recording.path.clone();
        let samples = clip.samples;
        let total = samples.len();
        let mut cursor = 0usize;

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for slot in data.iter_mut() {
                        *slot = if cursor < total {
                            let sample = samples[cursor];
                            cursor += 1;
                            sample
                        } else {
                            0.0
                        };
                    }
                    if cursor >= total
                        && cb_retired
                            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok()
                    {
                        // The channel is drained by the session driver; a
                        // full channel only drops a stale event.
                        let _ = tx.try_send(PlaybackFinished {
                            path: finished_path.clone(),
                            duration,
                        });
                    }
                },
                |err| {
                    error!("Playback stream error: {}", err);
                },
                None,
            )
            .map_err(|e| CoreError::PlaybackIo {
                reason: format!("Failed to build stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| CoreError::PlaybackIo {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.active = Some(ActiveStream {
            stream,
            recording: recording.clone(),
            retired,
        });

        info!(duration_ms = duration.as_millis(), "Playback started");

        Ok(duration)
    }

    /// Drop the active stream without sending a finished event.
    fn halt_active(&mut self) {
        if let Some(active) = self.active.take() {
            // Claim the completion so a final callback cannot send a
            // stale event after the stream handle is gone.
            let _ = active
                .retired
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
            drop(active.stream);
            debug!(path = ?active.recording.path, "Active stream halted");
        }
    }

    #[instrument(skip(self))]
    fn stop_stream(&mut self) -> CoreResult<bool> {
        let Some(active) = self.active.take() else {
            // Duplicate stop: the user raced natural completion.
            debug!("Stop requested while idle");
            return Ok(false);
        };

        let explicit = active
            .retired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        drop(active.stream);

        info!(path = ?active.recording.path, explicit, "Playback stopped");

        Ok(explicit)
    }
}

#[async_trait::async_trait(?Send)]
impl PlaybackBackend for PlaybackController {
    async fn play(&mut self, recording: &Recording) -> CoreResult<Duration> {
        self.start_stream(recording)
    }

    async fn stop(&mut self) -> CoreResult<bool> {
        self.stop_stream()
    }

    async fn teardown(&mut self) {
        self.halt_active();
        debug!("Playback device released");
    }
}

pub(crate) struct DecodedClip {
    pub(crate) samples: Vec<f32>,
    pub(crate) channels: u16,
    pub(crate) sample_rate: u32,
    pub(crate) duration: Duration,
}

/// Decode a WAV file into f32 samples. Accepts the store's own 16-bit
/// PCM output as well as 32-bit float WAV.
pub(crate) fn decode_wav(path: &Path) -> CoreResult<DecodedClip> {
    let reader = WavReader::open(path).map_err(|e| CoreError::PlaybackIo {
        reason: format!("Failed to open {:?}: {}", path, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let spec = reader.spec();
    let frames = reader.duration();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<Result<_, _>>(),
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>(),
    }
    .map_err(|e| CoreError::PlaybackIo {
        reason: format!("Failed to read samples from {:?}: {}", path, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let duration = Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64);

    debug!(
        sample_count = samples.len(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        duration_ms = duration.as_millis(),
        "Clip decoded"
    );

    Ok(DecodedClip {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        duration,
    })
}
