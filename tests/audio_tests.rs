use voxstream::audio::{
    f32_to_i16, mean_amplitude, AudioCapture, AudioFrame, CaptureConfig, FrameChunker,
    ReplayCapture, WavFileCapture,
};

#[test]
fn f32_to_i16_maps_reference_points() {
    assert_eq!(f32_to_i16(0.0), 0);
    assert_eq!(f32_to_i16(1.0), 32767);
    assert_eq!(f32_to_i16(-1.0), -32767);
    assert_eq!(f32_to_i16(0.5), 16384);
    // Out-of-range input clamps instead of wrapping
    assert_eq!(f32_to_i16(2.0), 32767);
    assert_eq!(f32_to_i16(-3.5), -32767);
}

#[test]
fn mean_amplitude_ignores_sign() {
    assert_eq!(mean_amplitude(&[]), 0.0);
    assert_eq!(mean_amplitude(&[0.5, -0.5]), 0.5);
}

#[test]
fn frame_serializes_little_endian() {
    let frame = AudioFrame {
        samples: vec![1, -2],
        sample_rate: 16_000,
        timestamp_ms: 0,
    };
    assert_eq!(frame.to_le_bytes(), vec![0x01, 0x00, 0xFE, 0xFF]);
}

#[test]
fn frame_duration_follows_sample_count() {
    let frame = AudioFrame {
        samples: vec![0; 4096],
        sample_rate: 16_000,
        timestamp_ms: 0,
    };
    assert_eq!(frame.duration_ms(), 256);
}

#[test]
fn chunker_emits_fixed_size_frames_with_sample_clock_timestamps() {
    let mut chunker = FrameChunker::new(16_000, 1, 16_000, 1600, 0.0);

    let frames = chunker.push(&vec![0.5; 1600]);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].samples.len(), 1600);
    assert_eq!(frames[0].timestamp_ms, 0);
    assert!(frames[0].samples.iter().all(|&s| s == 16384));

    // A partial push buffers; completing the frame stamps it at 100ms
    assert!(chunker.push(&vec![0.5; 800]).is_empty());
    let frames = chunker.push(&vec![0.5; 800]);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].timestamp_ms, 100);
}

#[test]
fn chunker_downmixes_stereo_by_averaging() {
    let mut chunker = FrameChunker::new(16_000, 2, 16_000, 4, 0.0);

    let interleaved = [0.2f32, 0.4, 0.2, 0.4, 0.2, 0.4, 0.2, 0.4];
    let frames = chunker.push(&interleaved);
    assert_eq!(frames.len(), 1);
    let expected = f32_to_i16((0.2f32 + 0.4) / 2.0);
    assert!(frames[0].samples.iter().all(|&s| s == expected));
}

#[test]
fn chunker_decimates_by_integer_ratio_across_pushes() {
    // 48kHz -> 16kHz keeps every third sample
    let mut chunker = FrameChunker::new(48_000, 1, 16_000, 4, 0.0);

    let input: Vec<f32> = (0..12).map(|i| i as f32 / 100.0).collect();
    let frames = chunker.push(&input[..2]);
    assert!(frames.is_empty());
    let frames = chunker.push(&input[2..]);
    assert_eq!(frames.len(), 1);

    let expected: Vec<i16> = [0.0f32, 0.03, 0.06, 0.09]
        .iter()
        .map(|&s| f32_to_i16(s))
        .collect();
    assert_eq!(frames[0].samples, expected);
}

#[test]
fn silence_gate_drops_frames_but_advances_the_clock() {
    let mut chunker = FrameChunker::new(16_000, 1, 16_000, 1600, 0.01);

    // Below the gate: no frame emitted
    assert!(chunker.push(&vec![0.001; 1600]).is_empty());

    // The next audible frame is stamped as if the silent one had shipped
    let frames = chunker.push(&vec![0.5; 1600]);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].timestamp_ms, 100);
}

#[test]
fn zero_threshold_disables_the_silence_gate() {
    let mut chunker = FrameChunker::new(16_000, 1, 16_000, 1600, 0.0);
    let frames = chunker.push(&vec![0.0; 1600]);
    assert_eq!(frames.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn wav_capture_replays_file_as_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speech.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..4000 {
        writer.write_sample(3277i16).unwrap();
    }
    writer.finalize().unwrap();

    let config = CaptureConfig {
        target_sample_rate: 16_000,
        frame_samples: 1600,
        silence_threshold: 0.0,
    };
    let mut capture = WavFileCapture::new(&path, config);

    let mut rx = capture.start().await.unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    // 4000 samples fill two 1600-sample frames; the tail never completes one
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].timestamp_ms, 0);
    assert_eq!(frames[1].timestamp_ms, 100);
    assert!(frames[0].samples.iter().all(|&s| s == 3277));

    capture.stop().await.unwrap();
    assert!(!capture.is_capturing());
}

#[tokio::test]
async fn wav_capture_reports_missing_file() {
    let mut capture = WavFileCapture::new("/nonexistent/audio.wav", CaptureConfig::default());
    let err = capture.start().await.unwrap_err();
    assert!(matches!(
        err,
        voxstream::error::CaptureError::SourceUnavailable(_)
    ));
}

#[tokio::test]
async fn replay_capture_passes_frames_through_and_closes_on_handle_drop() {
    let mut capture = ReplayCapture::new();
    let handle = capture.take_handle().unwrap();
    assert!(capture.take_handle().is_none());

    let mut rx = capture.start().await.unwrap();
    assert!(capture.is_capturing());
    assert!(capture.start().await.is_err());

    handle
        .send(AudioFrame {
            samples: vec![7; 16],
            sample_rate: 16_000,
            timestamp_ms: 42,
        })
        .await
        .unwrap();
    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.timestamp_ms, 42);

    drop(handle);
    assert!(rx.recv().await.is_none());
}
