use crate::{CaptureBackend, CoreError, CoreResult, Recording};

use std::{
    collections::VecDeque,
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        {Arc, Mutex},
    },
};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use hound::{WavSpec, WavWriter};
use tracing::{debug, error, info, instrument, warn};

/// Maximum samples to buffer (10 minutes at 48kHz mono).
/// Bounds memory if a take is left running; the oldest samples are
/// dropped once the cap is hit.
///
/// **Memory footprint at max capacity:**
/// - 48,000 Hz * 60s * 10 min * 4 bytes/f32 = ~115MB
pub(crate) const MAX_BUFFER_SAMPLES: usize = 48_000 * 60 * 10;

struct OpenInput {
    device: Device,
    config: StreamConfig,
}

struct ActiveTake {
    stream: Stream,
    path: PathBuf,
    samples: Arc<Mutex<VecDeque<f32>>>,
    /// Signals the audio callback to stop writing. Set to `true` before
    /// dropping the stream so no in-flight callback writes after the
    /// lock is acquired in `stop()`.
    shutdown: Arc<AtomicBool>,
}

/// Microphone capture controller: Uninitialized → Ready → Recording.
///
/// `initialize()` opens the input device (the microphone-permission
/// step), `start()` begins a take into a store-allocated path, and
/// `stop()` finalizes the take as a 16-bit PCM WAV file at the device
/// rate.
pub struct CaptureController {
    preferred_device: Option<String>,
    open: Option<OpenInput>,
    take: Option<ActiveTake>,
}

impl CaptureController {
    /// Create an uninitialized controller. `preferred_device` is a cpal
    /// input device name; `None` selects the host default.
    pub fn new(preferred_device: Option<String>) -> Self {
        Self {
            preferred_device,
            open: None,
            take: None,
        }
    }

    #[instrument(skip(self))]
    fn open_device(&mut self) -> CoreResult<()> {
        if self.open.is_some() {
            debug!("Capture device already open");
            return Ok(());
        }

        let host = cpal::default_host();

        let device = match &self.preferred_device {
            Some(name) => {
                let found = host
                    .input_devices()
                    .map_err(|e| CoreError::PermissionDenied {
                        reason: format!("Failed to enumerate input devices: {}", e),
                        location: ErrorLocation::from(Location::caller()),
                    })?
                    .find(|d| d.name().is_ok_and(|n| &n == name));
                match found {
                    Some(device) => device,
                    None => {
                        warn!(preferred = %name, "Configured input device not found, using default");
                        self.default_input(&host)?
                    }
                }
            }
            None => self.default_input(&host)?,
        };

        // A refused config query is how a denied microphone surfaces at
        // this boundary on most hosts.
        let config = device
            .default_input_config()
            .map_err(|e| CoreError::PermissionDenied {
                reason: format!("Input device refused config query: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate(),
            channels = config.channels(),
            "Capture device opened"
        );

        self.open = Some(OpenInput {
            device,
            config: config.into(),
        });

        Ok(())
    }

    fn default_input(&self, host: &cpal::Host) -> CoreResult<Device> {
        host.default_input_device()
            .ok_or_else(|| CoreError::PermissionDenied {
                reason: "No input device available".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[instrument(skip(self))]
    fn start_take(&mut self, path: &Path) -> CoreResult<()> {
        if self.take.is_some() {
            return Err(CoreError::InvalidState {
                operation: "start capture",
                state: "recording",
                location: ErrorLocation::from(Location::caller()),
            });
        }
        let Some(open) = &self.open else {
            return Err(CoreError::InvalidState {
                operation: "start capture",
                state: "uninitialized",
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let samples = Arc::new(Mutex::new(VecDeque::with_capacity(MAX_BUFFER_SAMPLES)));
        let shutdown = Arc::new(AtomicBool::new(false));

        let cb_samples = Arc::clone(&samples);
        let cb_shutdown = Arc::clone(&shutdown);

        let stream = open
            .device
            .build_input_stream(
                &open.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Check shutdown flag before acquiring the lock: once
                    // stop() sets it, no new samples are written even if
                    // CPAL fires one more callback before the stream is
                    // dropped.
                    if cb_shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    // Recover from lock poison rather than silently
                    // dropping audio: the VecDeque data is still valid.
                    let mut buf = cb_samples.lock().unwrap_or_else(|e| {
                        error!("Sample buffer lock poisoned, recovering: {}", e);
                        e.into_inner()
                    });
                    buf.extend(data.iter().copied());
                    while buf.len() > MAX_BUFFER_SAMPLES {
                        buf.pop_front();
                    }
                },
                |err| {
                    error!("Capture stream error: {}", err);
                },
                None,
            )
            .map_err(|e| CoreError::CaptureIo {
                reason: format!("Failed to build stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| CoreError::CaptureIo {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.take = Some(ActiveTake {
            stream,
            path: path.to_path_buf(),
            samples,
            shutdown,
        });

        info!(path = ?path, "Capture started");

        Ok(())
    }

    #[instrument(skip(self))]
    fn stop_take(&mut self) -> CoreResult<Recording> {
        let Some(take) = self.take.take() else {
            return Err(CoreError::InvalidState {
                operation: "stop capture",
                state: "idle",
                location: ErrorLocation::from(Location::caller()),
            });
        };

        // Signal the callback to stop writing BEFORE dropping the stream,
        // so a callback in flight during drop observes the flag and
        // returns before we acquire the lock below.
        take.shutdown.store(true, Ordering::Release);
        drop(take.stream);
        // Brief yield so an in-flight callback observes the shutdown flag
        // and completes. Most CPAL backends join the audio thread in
        // drop(), which makes this redundant, but it costs <5ms.
        std::thread::sleep(std::time::Duration::from_millis(5));

        let samples: Vec<f32> = take
            .samples
            .lock()
            .map_err(|e| CoreError::CaptureIo {
                reason: format!("Failed to lock samples: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .iter()
            .copied()
            .collect();

        if samples.is_empty() {
            return Err(CoreError::CaptureIo {
                reason: "No audio captured".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let Some(open) = &self.open else {
            return Err(CoreError::InvalidState {
                operation: "stop capture",
                state: "uninitialized",
                location: ErrorLocation::from(Location::caller()),
            });
        };

        encode_wav(
            &take.path,
            &samples,
            open.config.channels,
            open.config.sample_rate,
        )?;

        debug!(sample_count = samples.len(), "Captured audio samples");
        info!(path = ?take.path, "Capture finalized");

        Ok(Recording::new(take.path))
    }
}

#[async_trait::async_trait(?Send)]
impl CaptureBackend for CaptureController {
    async fn initialize(&mut self) -> CoreResult<()> {
        self.open_device()
    }

    async fn start(&mut self, path: &Path) -> CoreResult<()> {
        self.start_take(path)
    }

    async fn stop(&mut self) -> CoreResult<Recording> {
        self.stop_take()
    }

    async fn teardown(&mut self) {
        if let Some(take) = self.take.take() {
            take.shutdown.store(true, Ordering::Release);
            drop(take.stream);
            warn!(path = ?take.path, "Capture torn down mid-take, samples discarded");
        }
        self.open = None;
        debug!("Capture device released");
    }
}

/// Encode f32 samples as a 16-bit PCM WAV file.
///
/// A failure part-way leaves the partial file in place for the caller
/// to retry or delete.
pub(crate) fn encode_wav(
    path: &Path,
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
) -> CoreResult<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| CoreError::CaptureIo {
        reason: format!("Failed to create WAV writer: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    for &sample in samples {
        let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(quantized)
            .map_err(|e| CoreError::CaptureIo {
                reason: format!("Failed to write sample: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
    }

    writer.finalize().map_err(|e| CoreError::CaptureIo {
        reason: format!("Failed to finalize WAV file: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })
}
