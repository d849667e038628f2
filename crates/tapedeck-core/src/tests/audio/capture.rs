use crate::{
    CaptureBackend, CaptureController, CoreError,
    audio::capture::{MAX_BUFFER_SAMPLES, encode_wav},
};

use std::collections::VecDeque;

/// WHAT: Buffer respects MAX_BUFFER_SAMPLES limit
/// WHY: Prevents unbounded memory growth during long takes
#[test]
fn given_buffer_at_max_capacity_when_adding_samples_then_oldest_discarded() {
    // Given: A VecDeque at max capacity filled with 0.0
    let mut buf = VecDeque::with_capacity(MAX_BUFFER_SAMPLES);
    buf.extend(std::iter::repeat(0.0f32).take(MAX_BUFFER_SAMPLES));
    assert_eq!(buf.len(), MAX_BUFFER_SAMPLES);

    // When: Adding 1024 new samples (value 1.0) beyond the limit
    let new_samples = vec![1.0f32; 1024];
    buf.extend(new_samples.iter().copied());
    while buf.len() > MAX_BUFFER_SAMPLES {
        buf.pop_front();
    }

    // Then: Buffer stays at MAX_BUFFER_SAMPLES and newest samples preserved
    assert_eq!(buf.len(), MAX_BUFFER_SAMPLES);
    assert!((buf[MAX_BUFFER_SAMPLES - 1] - 1.0).abs() < f32::EPSILON);
    assert!((buf[MAX_BUFFER_SAMPLES - 1024] - 1.0).abs() < f32::EPSILON);
}

/// WHAT: Encoded WAV files carry the capture format and every sample
/// WHY: The finalized file is the only artifact of a take
#[test]
#[allow(clippy::unwrap_used)]
fn given_samples_when_encoding_then_wav_spec_and_length_match() {
    // Given: One second of a quiet ramp at 16kHz mono
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_1.wav");
    let samples: Vec<f32> = (0..16_000).map(|i| (i as f32 / 16_000.0) * 0.5).collect();

    // When: Encoding to disk
    encode_wav(&path, &samples, 1, 16_000).unwrap();

    // Then: hound reads back the same spec and sample count
    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(reader.duration(), 16_000);
}

/// WHAT: Out-of-range samples clamp instead of wrapping
/// WHY: An overdriven microphone must clip, not alias
#[test]
#[allow(clippy::unwrap_used)]
fn given_overdriven_samples_when_encoding_then_clamped_to_full_scale() {
    // Given: Samples beyond [-1.0, 1.0]
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_2.wav");
    let samples = vec![2.0f32, -2.0, 0.0];

    // When: Encoding to disk
    encode_wav(&path, &samples, 1, 16_000).unwrap();

    // Then: The extremes land on full scale
    let reader = hound::WavReader::open(&path).unwrap();
    let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded, vec![i16::MAX, -i16::MAX, 0]);
}

/// WHAT: Encoding into a missing directory is a capture I/O error
/// WHY: A vanished recordings directory must surface, not panic
#[test]
#[allow(clippy::unwrap_used)]
fn given_missing_directory_when_encoding_then_capture_io_error() {
    // Given: A destination under a directory that does not exist
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("recording_3.wav");

    // When: Encoding to disk
    let result = encode_wav(&path, &[0.0], 1, 16_000);

    // Then: CaptureIo
    assert!(matches!(result, Err(CoreError::CaptureIo { .. })));
}

/// WHAT: Start is rejected before the device is opened
/// WHY: The Uninitialized → Recording shortcut must be impossible
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_uninitialized_controller_when_starting_then_invalid_state() {
    // Given: A controller that was never initialized
    let dir = tempfile::tempdir().unwrap();
    let mut capture = CaptureController::new(None);

    // When: Starting a take
    let result = capture.start(&dir.path().join("recording_4.wav")).await;

    // Then: InvalidState
    assert!(matches!(result, Err(CoreError::InvalidState { .. })));
}

/// WHAT: Stop is rejected while no take is in flight
/// WHY: Duplicate stop on the capture side is a programmer error
#[tokio::test]
async fn given_idle_controller_when_stopping_then_invalid_state() {
    // Given: A controller with no active take
    let mut capture = CaptureController::new(None);

    // When: Stopping
    let result = capture.stop().await;

    // Then: InvalidState
    assert!(matches!(result, Err(CoreError::InvalidState { .. })));
}

/// WHAT: A full take round-trips through the real input device
/// WHY: Smoke check of the cpal wiring end to end
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
#[allow(clippy::unwrap_used)]
async fn given_real_device_when_recording_briefly_then_wav_produced() {
    // Given: An initialized controller and an allocated path
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_5.wav");
    let mut capture = CaptureController::new(None);
    capture.initialize().await.unwrap();

    // When: Capturing for half a second
    capture.start(&path).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    let recording = capture.stop().await.unwrap();

    // Then: The finalized file exists and decodes
    assert_eq!(recording.path, path);
    assert!(hound::WavReader::open(&path).is_ok());
    capture.teardown().await;
}
