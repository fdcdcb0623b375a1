use tokio::sync::mpsc;

use crate::error::CaptureError;

use super::frame::{AudioFrame, FRAME_SAMPLES, TARGET_SAMPLE_RATE};

/// Configuration shared by all capture sources.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Output sample rate (the rate negotiated with the STT endpoint).
    pub target_sample_rate: u32,
    /// Samples per emitted frame.
    pub frame_samples: usize,
    /// Mean-amplitude floor below which frames are dropped. 0.0 disables
    /// the gate entirely.
    pub silence_threshold: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            frame_samples: FRAME_SAMPLES,
            // Suppresses near-silence only; false negatives are acceptable.
            silence_threshold: 0.003,
        }
    }
}

/// Audio capture source trait.
///
/// Implementations:
/// - `MicrophoneCapture`: default input device via cpal
/// - `WavFileCapture`: paced replay of a WAV file
/// - `ReplayCapture`: push-driven source for tests
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    /// Begin capturing.
    ///
    /// Returns a channel receiver producing fixed-size PCM frames. Failing
    /// to acquire the device reports `PermissionDenied` or
    /// `SourceUnavailable`; no automatic retry happens here.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Release the device and any processing resources. Idempotent.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Whether the source is currently producing frames.
    fn is_capturing(&self) -> bool;

    /// Source name for logging.
    fn name(&self) -> &str;
}
