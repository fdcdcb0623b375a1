use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::CaptureError;

use super::capture::AudioCapture;
use super::frame::AudioFrame;

/// Test capture source fed by hand.
///
/// `take_handle()` hands out the single sender; every frame pushed through
/// it comes out of the receiver returned by `start()` unchanged. Dropping
/// the handle ends the stream, which is how tests simulate a source running
/// dry.
pub struct ReplayCapture {
    frame_tx: Option<mpsc::Sender<AudioFrame>>,
    frame_rx: Option<mpsc::Receiver<AudioFrame>>,
    running: Arc<AtomicBool>,
}

impl ReplayCapture {
    pub fn new() -> Self {
        let (frame_tx, frame_rx) = mpsc::channel(64);
        Self {
            frame_tx: Some(frame_tx),
            frame_rx: Some(frame_rx),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Take the sender used to push frames into the capture stream.
    ///
    /// Returns `None` on the second call; the capture itself keeps no copy,
    /// so the stream closes once the returned sender is dropped.
    pub fn take_handle(&mut self) -> Option<mpsc::Sender<AudioFrame>> {
        self.frame_tx.take()
    }
}

impl Default for ReplayCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioCapture for ReplayCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let rx = self
            .frame_rx
            .take()
            .ok_or_else(|| CaptureError::Device("replay capture already started".into()))?;
        self.running.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "replay"
    }
}
