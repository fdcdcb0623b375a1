use tracing::trace;

use super::frame::{f32_to_i16, mean_amplitude, AudioFrame};

/// Turns raw capture callbacks into fixed-size PCM frames.
///
/// Input is interleaved f32 at whatever rate/channel count the device uses;
/// output is mono frames at the target rate. Stereo is downmixed by
/// averaging, rate conversion is decimation by integer ratio (good enough
/// for speech; 44.1kHz inputs land slightly off-pitch and that is accepted).
///
/// Frames whose mean absolute amplitude falls below the silence threshold
/// are dropped before emission to save bandwidth. The sample clock still
/// advances for gated frames so later timestamps stay aligned with real time.
pub struct FrameChunker {
    input_channels: u16,
    decimation: usize,
    target_rate: u32,
    frame_samples: usize,
    silence_threshold: f32,
    /// Mono samples at the target rate, waiting to fill a frame.
    pending: Vec<f32>,
    /// Total target-rate samples consumed, including gated ones.
    sample_clock: u64,
    /// Round-robin position for decimation across push boundaries.
    decim_phase: usize,
}

impl FrameChunker {
    pub fn new(
        input_rate: u32,
        input_channels: u16,
        target_rate: u32,
        frame_samples: usize,
        silence_threshold: f32,
    ) -> Self {
        // Integer decimation only; upsampling is never attempted.
        let decimation = (input_rate / target_rate).max(1) as usize;
        Self {
            input_channels,
            decimation,
            target_rate,
            frame_samples,
            silence_threshold,
            pending: Vec::with_capacity(frame_samples),
            sample_clock: 0,
            decim_phase: 0,
        }
    }

    /// Feed raw interleaved samples; returns zero or more completed frames.
    pub fn push(&mut self, input: &[f32]) -> Vec<AudioFrame> {
        let channels = self.input_channels.max(1) as usize;

        for chunk in input.chunks_exact(channels) {
            // Downmix interleaved channels to mono by averaging.
            let mono = chunk.iter().sum::<f32>() / channels as f32;

            if self.decim_phase == 0 {
                self.pending.push(mono);
            }
            self.decim_phase = (self.decim_phase + 1) % self.decimation;
        }

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            let block = std::mem::replace(&mut self.pending, rest);

            let timestamp_ms = self.sample_clock * 1000 / self.target_rate as u64;
            self.sample_clock += self.frame_samples as u64;

            let amplitude = mean_amplitude(&block);
            if amplitude < self.silence_threshold {
                trace!("gated silent frame at {}ms (amplitude {:.5})", timestamp_ms, amplitude);
                continue;
            }

            frames.push(AudioFrame {
                samples: block.iter().copied().map(f32_to_i16).collect(),
                sample_rate: self.target_rate,
                timestamp_ms,
            });
        }

        frames
    }
}
