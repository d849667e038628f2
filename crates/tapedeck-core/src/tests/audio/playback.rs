use crate::{
    CoreError, PlaybackBackend, PlaybackController, Recording,
    audio::{capture::encode_wav, playback::decode_wav},
};

use std::time::Duration;

/// WHAT: Decoding recovers the encoded format and clip length
/// WHY: Playback streams at the file's own rate and reports duration
#[test]
#[allow(clippy::unwrap_used)]
fn given_encoded_clip_when_decoding_then_format_and_duration_match() {
    // Given: Two seconds of silence at 8kHz mono on disk
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_1.wav");
    encode_wav(&path, &vec![0.0f32; 16_000], 1, 8_000).unwrap();

    // When: Decoding
    let clip = decode_wav(&path).unwrap();

    // Then: Format and duration round-trip
    assert_eq!(clip.channels, 1);
    assert_eq!(clip.sample_rate, 8_000);
    assert_eq!(clip.samples.len(), 16_000);
    assert_eq!(clip.duration, Duration::from_secs(2));
}

/// WHAT: Quantized samples decode close to their source values
/// WHY: The i16 round-trip must not audibly distort clips
#[test]
#[allow(clippy::unwrap_used)]
fn given_known_samples_when_round_tripping_then_values_preserved() {
    // Given: A handful of representative amplitudes
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_2.wav");
    let source = vec![0.0f32, 0.25, -0.25, 0.99, -0.99];
    encode_wav(&path, &source, 1, 16_000).unwrap();

    // When: Decoding
    let clip = decode_wav(&path).unwrap();

    // Then: Every sample is within one quantization step
    for (decoded, original) in clip.samples.iter().zip(&source) {
        assert!((decoded - original).abs() < 1.0 / i16::MAX as f32 * 2.0);
    }
}

/// WHAT: An unreadable path is a playback I/O error
/// WHY: A clip deleted out from under the catalog must surface cleanly
#[test]
#[allow(clippy::unwrap_used)]
fn given_missing_file_when_decoding_then_playback_io_error() {
    // Given: A path with no file behind it
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_3.wav");

    // When: Decoding
    let result = decode_wav(&path);

    // Then: PlaybackIo
    assert!(matches!(result, Err(CoreError::PlaybackIo { .. })));
}

/// WHAT: Stop while idle is a tolerated no-op
/// WHY: User stop and natural completion can race
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
#[allow(clippy::unwrap_used)]
async fn given_idle_controller_when_stopping_then_noop() {
    // Given: A controller with no active stream
    let (tx, _rx) = tokio::sync::mpsc::channel(16);
    let mut playback = PlaybackController::new(tx).unwrap();

    // When: Stopping twice
    let first = playback.stop().await.unwrap();
    let second = playback.stop().await.unwrap();

    // Then: Neither call claims to have retired a stream
    assert!(!first);
    assert!(!second);
}

/// WHAT: A short clip plays to natural completion on the real device
/// WHY: Smoke check of the output wiring and the one-shot notification
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
#[allow(clippy::unwrap_used)]
async fn given_real_device_when_playing_short_clip_then_finished_event_fires() {
    // Given: A 250ms clip on disk and a live controller
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_4.wav");
    encode_wav(&path, &vec![0.0f32; 4_000], 1, 16_000).unwrap();
    let recording = Recording::new(path.clone());

    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let mut playback = PlaybackController::new(tx).unwrap();

    // When: Playing and waiting past the clip length
    let duration = playback.play(&recording).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();

    // Then: Exactly one finished event for the clip, and stop reports
    // that natural completion already retired the stream
    assert_eq!(event.path, path);
    assert_eq!(event.duration, duration);
    assert!(!playback.stop().await.unwrap());
    playback.teardown().await;
}
