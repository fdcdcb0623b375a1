use std::time::Duration;

use crate::session::SessionState;

/// Errors surfaced by capture sources.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The user or OS refused access to the capture device.
    #[error("capture permission denied: {0}")]
    PermissionDenied(String),

    /// The requested capture kind does not exist on this machine.
    #[error("capture source unavailable: {0}")]
    SourceUnavailable(String),

    /// The device failed after capture started.
    #[error("capture device error: {0}")]
    Device(String),
}

/// Errors surfaced by the transcription session and orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Missing or invalid credential/option. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The WebSocket did not reach the open state in time.
    #[error("connection timed out after {0:?}")]
    ConnectionTimeout(Duration),

    /// Handshake or transport failure while connecting.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Every reconnect attempt failed.
    #[error("gave up reconnecting after {attempts} attempts: {last_error}")]
    ReconnectExhausted { attempts: u32, last_error: String },

    /// An operation was called in a state that does not allow it.
    #[error("invalid state: cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Malformed inbound message. The message is dropped, the session lives.
    #[error("protocol error: {0}")]
    Protocol(String),
}
