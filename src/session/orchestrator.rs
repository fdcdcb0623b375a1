use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::AudioCapture;
use crate::error::SessionError;
use crate::stt::{
    SessionSummary, SttConfig, SttEvent, TranscriptAccumulator, TranscriptSegment,
    TranscriptionSession,
};

use super::events::{dispatch_to_observer, SessionEvent, SessionObserver};
use super::export::{to_srt, ExportMetadata, TranscriptExport};
use super::state::SessionState;
use super::stats::SessionStats;

/// Capacity of the broadcast channel handed to `subscribe()` callers.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Accumulated per-session data the orchestrator serves to the UI layer.
#[derive(Default)]
struct Store {
    session_id: String,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    accumulator: TranscriptAccumulator,
    stats: SessionStats,
}

/// Sequences session lifecycle for the surrounding application.
///
/// Wraps one [`TranscriptionSession`] at a time behind the
/// Idle/Initializing/Active/Paused/Stopping/Error state machine, accumulates
/// transcript and statistics, and fans events out to registered observers
/// and broadcast subscribers. Observers never see session internals; the
/// dependency is strictly one-way.
pub struct SessionOrchestrator {
    state: Arc<Mutex<SessionState>>,
    store: Arc<Mutex<Store>>,
    observers: Arc<Mutex<Vec<Arc<dyn SessionObserver>>>>,
    event_tx: broadcast::Sender<SessionEvent>,
    session: tokio::sync::Mutex<Option<TranscriptionSession>>,
    pump: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SessionOrchestrator {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
            store: Arc::new(Mutex::new(Store::default())),
            observers: Arc::new(Mutex::new(Vec::new())),
            event_tx,
            session: tokio::sync::Mutex::new(None),
            pump: tokio::sync::Mutex::new(None),
        }
    }

    /// Register an observer. Delivery order is registration order.
    pub fn register_observer(&self, observer: Arc<dyn SessionObserver>) {
        lock(&self.observers).push(observer);
    }

    /// Typed event stream for subscribers that prefer a channel.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Start a new session.
    ///
    /// Fails with `InvalidState` unless Idle (the state is claimed before
    /// any awaiting, so concurrent starts are rejected rather than
    /// interleaved) and with `Configuration` before any network attempt if
    /// the credential is missing.
    pub async fn start_session(
        &self,
        config: SttConfig,
        capture: Box<dyn AudioCapture>,
    ) -> Result<String, SessionError> {
        {
            let mut state = lock(&self.state);
            if *state != SessionState::Idle {
                return Err(SessionError::InvalidState {
                    operation: "start_session",
                    state: *state,
                });
            }
            *state = SessionState::Initializing;
        }
        self.emit(SessionEvent::StateChanged {
            from: SessionState::Idle,
            to: SessionState::Initializing,
        });

        // Fail fast on configuration problems, before touching the network.
        if let Err(e) = config.validate() {
            self.fail_with(SessionState::Initializing, &e);
            return Err(e);
        }

        let (session, event_rx) = match TranscriptionSession::start(config, capture).await {
            Ok(started) => started,
            Err(e) => {
                self.fail_with(SessionState::Initializing, &e);
                return Err(e);
            }
        };

        let session_id = session.session_id().to_string();
        {
            let mut store = lock(&self.store);
            *store = Store {
                session_id: session_id.clone(),
                started_at: Some(session.started_at()),
                ended_at: None,
                accumulator: TranscriptAccumulator::new(),
                stats: SessionStats {
                    started_at: Some(session.started_at()),
                    ..Default::default()
                },
            };
        }
        *self.session.lock().await = Some(session);

        let pump = tokio::spawn(pump_events(
            event_rx,
            Arc::clone(&self.store),
            Arc::clone(&self.observers),
            self.event_tx.clone(),
            Arc::clone(&self.state),
        ));
        *self.pump.lock().await = Some(pump);

        self.set_state(SessionState::Initializing, SessionState::Active);
        self.emit(SessionEvent::SessionStarted {
            session_id: session_id.clone(),
        });

        info!("Session {} started", session_id);
        Ok(session_id)
    }

    /// End the current session, if any. Idempotent: stopping when never
    /// started, or twice in a row, returns `Ok(None)`. Also the way back to
    /// Idle from the Error state.
    pub async fn stop_session(&self) -> Result<Option<SessionSummary>, SessionError> {
        let mut session = match self.session.lock().await.take() {
            Some(session) => session,
            None => {
                let state = self.state();
                if state == SessionState::Error {
                    self.set_state(SessionState::Error, SessionState::Idle);
                }
                return Ok(None);
            }
        };

        let before = self.state();
        if before == SessionState::Active || before == SessionState::Paused {
            self.set_state(before, SessionState::Stopping);
        }

        let summary = session.stop().await?;

        // The event channel closes once the session task ends; let the pump
        // finish delivering whatever the final flush produced.
        if let Some(pump) = self.pump.lock().await.take() {
            let _ = pump.await;
        }

        lock(&self.store).ended_at = Some(Utc::now());

        let from = self.state();
        if from != SessionState::Idle {
            self.set_state(from, SessionState::Idle);
        }
        if let Some(summary) = &summary {
            self.emit(SessionEvent::SessionEnded(summary.clone()));
            info!(
                "Session {} ended: {} words in {:.1}s",
                summary.session_id, summary.word_count, summary.duration_secs
            );
        }
        Ok(summary)
    }

    /// Stop forwarding audio without touching the connection.
    pub async fn pause_session(&self) -> Result<(), SessionError> {
        {
            let state = lock(&self.state);
            if *state != SessionState::Active {
                return Err(SessionError::InvalidState {
                    operation: "pause_session",
                    state: *state,
                });
            }
        }
        if let Some(session) = self.session.lock().await.as_ref() {
            session.pause();
        }
        self.set_state(SessionState::Active, SessionState::Paused);
        Ok(())
    }

    pub async fn resume_session(&self) -> Result<(), SessionError> {
        {
            let state = lock(&self.state);
            if *state != SessionState::Paused {
                return Err(SessionError::InvalidState {
                    operation: "resume_session",
                    state: *state,
                });
            }
        }
        if let Some(session) = self.session.lock().await.as_ref() {
            session.resume();
        }
        self.set_state(SessionState::Paused, SessionState::Active);
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn stats(&self) -> SessionStats {
        let mut stats = lock(&self.store).stats.clone();
        stats.refresh_duration();
        stats
    }

    pub fn current_transcript(&self) -> String {
        lock(&self.store).accumulator.transcript().to_string()
    }

    pub fn interim_text(&self) -> String {
        lock(&self.store).accumulator.interim().to_string()
    }

    pub fn segments(&self) -> Vec<TranscriptSegment> {
        lock(&self.store).accumulator.segments().to_vec()
    }

    /// Full transcript as plain text.
    pub fn export_text(&self) -> String {
        self.current_transcript()
    }

    /// Full transcript plus metadata and segments as pretty JSON.
    pub fn export_json(&self) -> Result<String, SessionError> {
        let store = lock(&self.store);
        let export = TranscriptExport {
            transcript: store.accumulator.transcript().to_string(),
            metadata: ExportMetadata {
                session_id: store.session_id.clone(),
                start_time: store.started_at.unwrap_or_else(Utc::now),
                end_time: store.ended_at.unwrap_or_else(Utc::now),
                word_count: store.accumulator.word_count(),
            },
            segments: store.accumulator.segments().to_vec(),
        };
        drop(store);
        export.to_json()
    }

    /// Final segments as numbered subtitle cues.
    pub fn export_srt(&self) -> String {
        to_srt(&lock(&self.store).accumulator.segments().to_vec())
    }

    /// The transition only applies if `from` is still the current state
    /// under the lock; a state written concurrently (the event pump moving
    /// to Error) is never overwritten by a caller holding a stale read.
    fn set_state(&self, from: SessionState, to: SessionState) {
        {
            let mut state = lock(&self.state);
            if *state != from || !from.can_transition_to(to) {
                warn!(
                    "Suppressing state transition {:?} -> {:?} (current state {:?})",
                    from, to, *state
                );
                return;
            }
            *state = to;
        }
        self.emit(SessionEvent::StateChanged { from, to });
    }

    /// Route a startup failure into the Error state with an error event.
    fn fail_with(&self, from: SessionState, error: &SessionError) {
        {
            let mut store = lock(&self.store);
            store.stats.error_count += 1;
        }
        self.set_state(from, SessionState::Error);
        self.emit(SessionEvent::Error {
            message: error.to_string(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        let observers = lock(&self.observers).clone();
        for observer in &observers {
            dispatch_to_observer(observer.as_ref(), &event);
        }
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

impl Default for SessionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Consumes session events, maintains the store, and fans out to observers
/// and broadcast subscribers.
async fn pump_events(
    mut event_rx: mpsc::Receiver<SttEvent>,
    store: Arc<Mutex<Store>>,
    observers: Arc<Mutex<Vec<Arc<dyn SessionObserver>>>>,
    event_tx: broadcast::Sender<SessionEvent>,
    state: Arc<Mutex<SessionState>>,
) {
    let emit = |event: SessionEvent| {
        let list = lock(&observers).clone();
        for observer in &list {
            dispatch_to_observer(observer.as_ref(), &event);
        }
        let _ = event_tx.send(event);
    };

    while let Some(event) = event_rx.recv().await {
        match event {
            SttEvent::Connected => debug!("Connection established"),
            SttEvent::Interim { text, confidence } => {
                {
                    let mut store = lock(&store);
                    store.accumulator.apply_interim(&text);
                    store.stats.interim_count += 1;
                }
                emit(SessionEvent::TranscriptInterim { text, confidence });
            }
            SttEvent::Final(segment) => {
                let stats = {
                    let mut store = lock(&store);
                    store.accumulator.append_segment(segment.clone());
                    store.stats.final_count += 1;
                    store.stats.word_count = store.accumulator.word_count();
                    let mut stats = store.stats.clone();
                    stats.refresh_duration();
                    stats
                };
                emit(SessionEvent::TranscriptFinal(segment));
                emit(SessionEvent::StatsUpdated(stats));
            }
            SttEvent::SpeechStarted => debug!("Speech started"),
            SttEvent::UtteranceEnd => debug!("Utterance ended"),
            SttEvent::Reconnecting { attempt, delay_ms } => {
                info!("Reconnecting (attempt {}, delay {}ms)", attempt, delay_ms);
            }
            SttEvent::Reconnected => info!("Connection restored"),
            SttEvent::Fatal { message } => {
                {
                    let mut store = lock(&store);
                    store.stats.error_count += 1;
                }
                let from = {
                    let mut state = lock(&state);
                    let from = *state;
                    if from.can_transition_to(SessionState::Error) {
                        *state = SessionState::Error;
                    }
                    from
                };
                if from.can_transition_to(SessionState::Error) {
                    emit(SessionEvent::StateChanged {
                        from,
                        to: SessionState::Error,
                    });
                }
                emit(SessionEvent::Error { message });
            }
            SttEvent::Closed => debug!("Connection closed cleanly"),
        }
    }
    debug!("Event pump finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_transition_source_cannot_overwrite_a_newer_state() {
        let orchestrator = SessionOrchestrator::new();

        // A fatal error lands between a caller's state read and its write;
        // the stale Active -> Paused transition must not clobber Error
        *lock(&orchestrator.state) = SessionState::Error;
        orchestrator.set_state(SessionState::Active, SessionState::Paused);
        assert_eq!(orchestrator.state(), SessionState::Error);

        // The same edge applies normally when the source is current
        *lock(&orchestrator.state) = SessionState::Active;
        orchestrator.set_state(SessionState::Active, SessionState::Paused);
        assert_eq!(orchestrator.state(), SessionState::Paused);
    }
}
