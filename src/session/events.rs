use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::stt::{SessionSummary, TranscriptSegment};

use super::state::SessionState;
use super::stats::SessionStats;

/// Everything the orchestrator can tell the outside world, as one
/// discriminated union so subscribers handle variants exhaustively.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    SessionStarted {
        session_id: String,
    },
    TranscriptInterim {
        text: String,
        confidence: f32,
    },
    TranscriptFinal(TranscriptSegment),
    StatsUpdated(SessionStats),
    Error {
        message: String,
    },
    SessionEnded(SessionSummary),
}

/// Observer protocol for callers that prefer callbacks over a channel.
///
/// Every method defaults to a no-op; implement only the ones you care
/// about. Observers are invoked in registration order.
pub trait SessionObserver: Send + Sync {
    fn on_state_changed(&self, _from: SessionState, _to: SessionState) {}
    fn on_session_started(&self, _session_id: &str) {}
    fn on_transcript_interim(&self, _text: &str, _confidence: f32) {}
    fn on_transcript_final(&self, _segment: &TranscriptSegment) {}
    fn on_stats_updated(&self, _stats: &SessionStats) {}
    fn on_error(&self, _message: &str) {}
    fn on_session_ended(&self, _summary: &SessionSummary) {}
}

/// Deliver one event to one observer, isolating panics so a misbehaving
/// observer never blocks the rest of the delivery list.
pub(crate) fn dispatch_to_observer(observer: &dyn SessionObserver, event: &SessionEvent) {
    let result = catch_unwind(AssertUnwindSafe(|| match event {
        SessionEvent::StateChanged { from, to } => observer.on_state_changed(*from, *to),
        SessionEvent::SessionStarted { session_id } => observer.on_session_started(session_id),
        SessionEvent::TranscriptInterim { text, confidence } => {
            observer.on_transcript_interim(text, *confidence)
        }
        SessionEvent::TranscriptFinal(segment) => observer.on_transcript_final(segment),
        SessionEvent::StatsUpdated(stats) => observer.on_stats_updated(stats),
        SessionEvent::Error { message } => observer.on_error(message),
        SessionEvent::SessionEnded(summary) => observer.on_session_ended(summary),
    }));
    if result.is_err() {
        warn!("Observer panicked while handling an event; continuing");
    }
}
