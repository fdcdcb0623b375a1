pub mod events;
pub mod export;
pub mod orchestrator;
pub mod state;
pub mod stats;

pub use events::{SessionEvent, SessionObserver};
pub use export::{format_srt_timestamp, to_srt, ExportMetadata, TranscriptExport};
pub use orchestrator::SessionOrchestrator;
pub use state::SessionState;
pub use stats::SessionStats;
