use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::CaptureError;

use super::capture::{AudioCapture, CaptureConfig};
use super::chunker::FrameChunker;
use super::frame::AudioFrame;

/// Microphone capture via cpal's default input device.
///
/// cpal streams are not `Send`, so a dedicated thread owns the stream for
/// the lifetime of the capture; the async side only sees the frame channel.
pub struct MicrophoneCapture {
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MicrophoneCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for MicrophoneCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::Device("microphone already capturing".into()));
        }

        let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(64);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), CaptureError>>();

        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            run_capture_thread(config, frame_tx, ready_tx, running);
        });
        self.thread = Some(handle);

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("Microphone capture started");
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(CaptureError::Device("capture thread exited during startup".into()))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Microphone capture already stopped");
        }
        if let Some(handle) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn run_capture_thread(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    running: Arc<AtomicBool>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err(CaptureError::SourceUnavailable(
                "no default input device".into(),
            )));
            return;
        }
    };

    let input_config = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(classify_device_error(e.to_string())));
            return;
        }
    };

    let stream_config: StreamConfig = input_config.clone().into();
    let sample_format = input_config.sample_format();
    info!(
        "Input device: {} Hz, {} channels, {:?}",
        stream_config.sample_rate.0, stream_config.channels, sample_format
    );

    let mut chunker = FrameChunker::new(
        stream_config.sample_rate.0,
        stream_config.channels,
        config.target_sample_rate,
        config.frame_samples,
        config.silence_threshold,
    );

    // The callback runs on the audio thread; never block it. Frames that
    // can't be queued are dropped.
    let mut emit = move |samples: &[f32]| {
        for frame in chunker.push(samples) {
            if frame_tx.try_send(frame).is_err() {
                warn!("Frame channel full, dropping audio frame");
            }
        }
    };

    let err_fn = |err| warn!("Input stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| emit(data),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                let scale = 1.0 / i16::MAX as f32;
                let floats: Vec<f32> = data.iter().map(|&s| s as f32 * scale).collect();
                emit(&floats);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _| {
                const MIDPOINT: f32 = 32768.0;
                let floats: Vec<f32> =
                    data.iter().map(|&s| (s as f32 - MIDPOINT) / MIDPOINT).collect();
                emit(&floats);
            },
            err_fn,
            None,
        ),
        other => {
            let _ = ready_tx.send(Err(CaptureError::Device(format!(
                "unsupported input sample format {:?}",
                other
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(classify_device_error(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(classify_device_error(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Keep the stream alive until stop() clears the flag.
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
    debug!("Capture thread exiting");
}

fn classify_device_error(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not permitted") {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::Device(message)
    }
}
