pub mod capture;
pub mod chunker;
pub mod file;
pub mod frame;
pub mod microphone;
pub mod replay;

pub use capture::{AudioCapture, CaptureConfig};
pub use chunker::FrameChunker;
pub use file::WavFileCapture;
pub use frame::{f32_to_i16, mean_amplitude, AudioFrame, FRAME_SAMPLES, TARGET_SAMPLE_RATE};
pub use microphone::MicrophoneCapture;
pub use replay::ReplayCapture;
