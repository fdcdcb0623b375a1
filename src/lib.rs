pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod stt;

pub use audio::{
    AudioCapture, AudioFrame, CaptureConfig, FrameChunker, MicrophoneCapture, ReplayCapture,
    WavFileCapture, FRAME_SAMPLES, TARGET_SAMPLE_RATE,
};
pub use config::Config;
pub use error::{CaptureError, SessionError};
pub use session::{
    SessionEvent, SessionObserver, SessionOrchestrator, SessionState, SessionStats,
    TranscriptExport,
};
pub use stt::{
    ConnectionStatus, ReconnectPolicy, SessionSummary, SttConfig, SttEvent, TranscriptSegment,
    TranscriptionSession,
};
