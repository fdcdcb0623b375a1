pub mod config;
pub mod messages;
pub mod session;
pub mod transcript;

pub use config::{ReconnectPolicy, SttConfig};
pub use messages::{ControlMessage, ServerMessage};
pub use session::{ConnectionStatus, SessionSummary, SttEvent, TranscriptionSession};
pub use transcript::{TranscriptAccumulator, TranscriptSegment};
