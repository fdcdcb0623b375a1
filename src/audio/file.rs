use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::CaptureError;

use super::capture::{AudioCapture, CaptureConfig};
use super::chunker::FrameChunker;
use super::frame::AudioFrame;

/// Replays a WAV file as a live capture source, paced to real time.
///
/// Useful for demos and batch transcription without a microphone. The file
/// is decoded up front; frames are emitted at the rate a live device would
/// produce them, then the channel closes.
pub struct WavFileCapture {
    path: PathBuf,
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WavFileCapture {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig) -> Self {
        Self {
            path: path.into(),
            config,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for WavFileCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let reader = hound::WavReader::open(&self.path)
            .map_err(|e| CaptureError::SourceUnavailable(format!("{}: {}", self.path.display(), e)))?;

        let spec = reader.spec();
        info!(
            "Replaying {} ({} Hz, {} channels, {} bits)",
            self.path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample
        );

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .filter_map(|s| s.ok())
                    .map(|s| s as f32 * scale)
                    .collect()
            }
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .filter_map(|s| s.ok())
                .collect(),
        };

        let mut chunker = FrameChunker::new(
            spec.sample_rate,
            spec.channels,
            self.config.target_sample_rate,
            self.config.frame_samples,
            self.config.silence_threshold,
        );

        let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(64);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        // One input chunk per tick, sized to ~100ms of source audio.
        let chunk_len = (spec.sample_rate as usize / 10).max(1) * spec.channels as usize;
        let tick = Duration::from_millis(100);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            for chunk in samples.chunks(chunk_len) {
                interval.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                for frame in chunker.push(chunk) {
                    if frame_tx.send(frame).await.is_err() {
                        return;
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
            debug!("WAV replay finished");
        });
        self.task = Some(task);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
