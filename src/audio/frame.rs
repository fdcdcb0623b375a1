/// Sample rate the STT endpoint expects (Hz).
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Samples per frame sent over the wire. Must match the value the endpoint
/// was told via the `sample_rate`/`encoding` query parameters; a mismatch
/// garbles audio silently rather than producing a protocol error.
pub const FRAME_SAMPLES: usize = 4096;

/// One fixed-size chunk of mono 16-bit PCM audio.
///
/// Frames are produced by a capture source, forwarded to the transcription
/// session exactly once, and discarded after transmission.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// PCM samples (i16, mono).
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Milliseconds since capture started, derived from the sample clock.
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration of this frame in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// Serialize samples as little-endian bytes for the wire.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Convert one float sample in [-1.0, 1.0] to a 16-bit PCM sample.
///
/// Out-of-range input is clamped. Rounding is half-away-from-zero, so 0.5
/// maps to 16384.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Mean absolute amplitude of a float sample block, used by the silence gate.
pub fn mean_amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}
