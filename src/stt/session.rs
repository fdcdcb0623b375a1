use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::audio::{AudioCapture, AudioFrame};
use crate::error::SessionError;

use super::config::SttConfig;
use super::messages::{ControlMessage, ServerMessage};
use super::transcript::{TranscriptAccumulator, TranscriptSegment};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How long an idle connection is kept alive between keepalive pings.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(8);

/// Grace period after `CloseStream` to receive the server's final flush.
const CLOSE_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Connection lifecycle, independent of the orchestrator's session state.
/// A session can be Active while the connection is Reconnecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

/// Events emitted by a running transcription session.
#[derive(Debug, Clone)]
pub enum SttEvent {
    Connected,
    Interim { text: String, confidence: f32 },
    Final(TranscriptSegment),
    SpeechStarted,
    UtteranceEnd,
    Reconnecting { attempt: u32, delay_ms: u64 },
    Reconnected,
    /// Unrecoverable: reconnect attempts exhausted.
    Fatal { message: String },
    /// The socket closed cleanly after a graceful shutdown.
    Closed,
}

/// Everything a finished session hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub transcript: String,
    pub segments: Vec<TranscriptSegment>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub word_count: usize,
}

#[derive(Debug)]
struct Shared {
    status: Mutex<ConnectionStatus>,
    paused: AtomicBool,
    accumulator: Mutex<TranscriptAccumulator>,
}

impl Shared {
    fn new() -> Self {
        Self {
            status: Mutex::new(ConnectionStatus::Disconnected),
            paused: AtomicBool::new(false),
            accumulator: Mutex::new(TranscriptAccumulator::new()),
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        *lock_ignoring_poison(&self.status) = status;
    }

    fn status(&self) -> ConnectionStatus {
        *lock_ignoring_poison(&self.status)
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One logical transcription session against the remote STT endpoint.
///
/// Owns the WebSocket and the capture source it was started with. Audio
/// frames flow capture → socket; inbound JSON results update the transcript
/// accumulator and surface as [`SttEvent`]s. An unexpected disconnect
/// triggers linear-backoff reconnection; frames arriving during the gap are
/// dropped, never buffered.
#[derive(Debug)]
pub struct TranscriptionSession {
    session_id: String,
    started_at: DateTime<Utc>,
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl TranscriptionSession {
    /// Validate the config, open the socket, start the capture source, and
    /// spawn the session task.
    ///
    /// The handshake has a hard timeout; failures are retried per the
    /// reconnect policy before the last error is surfaced.
    pub async fn start(
        config: SttConfig,
        mut capture: Box<dyn AudioCapture>,
    ) -> Result<(Self, mpsc::Receiver<SttEvent>), SessionError> {
        config.validate()?;

        let session_id = uuid::Uuid::new_v4().to_string();
        info!("Starting transcription session {}", session_id);

        let shared = Arc::new(Shared::new());
        shared.set_status(ConnectionStatus::Connecting);

        let ws = initial_connect(&config).await.map_err(|e| {
            shared.set_status(ConnectionStatus::Failed);
            e
        })?;
        shared.set_status(ConnectionStatus::Connected);

        let frame_rx = match capture.start().await {
            Ok(rx) => rx,
            Err(e) => {
                shared.set_status(ConnectionStatus::Disconnected);
                return Err(e.into());
            }
        };
        debug!("Capture source '{}' started", capture.name());

        let (event_tx, event_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let started_at = Utc::now();

        let run = SessionTask {
            config,
            shared: Arc::clone(&shared),
            event_tx,
            shutdown_rx,
            started_at,
            reconnect_attempts: 0,
        };
        let task = tokio::spawn(run.run(ws, frame_rx, capture));

        Ok((
            Self {
                session_id,
                started_at,
                shared,
                shutdown_tx,
                task: Some(task),
            },
            event_rx,
        ))
    }

    /// Gracefully end the session: `CloseStream`, a short drain for the
    /// final flush, socket close, capture release.
    ///
    /// Idempotent; the second call returns `Ok(None)`.
    pub async fn stop(&mut self) -> Result<Option<SessionSummary>, SessionError> {
        let task = match self.task.take() {
            Some(task) => task,
            None => return Ok(None),
        };

        info!("Stopping transcription session {}", self.session_id);
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = task.await {
            error!("Session task panicked: {}", e);
        }

        if self.shared.status() != ConnectionStatus::Failed {
            self.shared.set_status(ConnectionStatus::Disconnected);
        }

        let ended_at = Utc::now();
        let accumulator = lock_ignoring_poison(&self.shared.accumulator);
        let summary = SessionSummary {
            session_id: self.session_id.clone(),
            transcript: accumulator.transcript().to_string(),
            segments: accumulator.segments().to_vec(),
            started_at: self.started_at,
            ended_at,
            duration_secs: (ended_at - self.started_at).num_milliseconds() as f64 / 1000.0,
            word_count: accumulator.word_count(),
        };
        Ok(Some(summary))
    }

    /// Stop forwarding audio frames. The socket stays open; this is a local
    /// flag, not a connection transition.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Space-joined concatenation of all final segments so far.
    pub fn current_transcript(&self) -> String {
        lock_ignoring_poison(&self.shared.accumulator).transcript().to_string()
    }

    pub fn interim_text(&self) -> String {
        lock_ignoring_poison(&self.shared.accumulator).interim().to_string()
    }

    pub fn segments(&self) -> Vec<TranscriptSegment> {
        lock_ignoring_poison(&self.shared.accumulator).segments().to_vec()
    }
}

fn build_request(
    config: &SttConfig,
) -> Result<tokio_tungstenite::tungstenite::http::Request<()>, SessionError> {
    let mut request = config
        .websocket_url()
        .into_client_request()
        .map_err(|e| SessionError::Connection(format!("invalid endpoint URL: {}", e)))?;
    let auth = format!("Token {}", config.api_key)
        .parse()
        .map_err(|_| SessionError::Configuration("API key contains invalid characters".into()))?;
    request.headers_mut().insert(AUTHORIZATION, auth);
    Ok(request)
}

/// One connect attempt with the hard handshake timeout.
async fn connect_once(config: &SttConfig) -> Result<WsStream, SessionError> {
    let request = build_request(config)?;
    match tokio::time::timeout(config.connect_timeout, connect_async(request)).await {
        Ok(Ok((ws, _response))) => Ok(ws),
        Ok(Err(e)) => Err(SessionError::Connection(e.to_string())),
        Err(_) => Err(SessionError::ConnectionTimeout(config.connect_timeout)),
    }
}

/// Initial connect, retried per the reconnect policy before giving up.
async fn initial_connect(config: &SttConfig) -> Result<WsStream, SessionError> {
    let mut attempt = 0u32;
    loop {
        match connect_once(config).await {
            Ok(ws) => {
                info!("Connected to {}", config.endpoint);
                return Ok(ws);
            }
            Err(e) => {
                attempt += 1;
                if attempt > config.reconnect.max_attempts {
                    return Err(e);
                }
                let delay = config.reconnect.delay_for(attempt);
                warn!("Connect attempt {} failed ({}), retrying in {:?}", attempt, e, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

enum ReconnectOutcome {
    Resumed(WsSink, WsSource),
    Stopped,
    Failed,
}

struct SessionTask {
    config: SttConfig,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<SttEvent>,
    shutdown_rx: watch::Receiver<bool>,
    started_at: DateTime<Utc>,
    /// Cumulative across the whole session; an abnormal close never resets
    /// it, so a flapping connection still hits the cap.
    reconnect_attempts: u32,
}

impl SessionTask {
    async fn run(
        mut self,
        ws: WsStream,
        mut frame_rx: mpsc::Receiver<AudioFrame>,
        mut capture: Box<dyn AudioCapture>,
    ) {
        let (mut ws_tx, mut ws_rx) = ws.split();
        let _ = self.event_tx.send(SttEvent::Connected).await;

        // Separate handle so the select arm does not borrow `self`.
        let mut shutdown_rx = self.shutdown_rx.clone();
        let shared = Arc::clone(&self.shared);

        let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
        keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        keepalive.tick().await;

        let mut clean_close = false;

        'session: loop {
            tokio::select! {
                frame = frame_rx.recv() => {
                    let frame = match frame {
                        Some(frame) => frame,
                        None => {
                            debug!("Capture stream ended");
                            clean_close = true;
                            break 'session;
                        }
                    };
                    if shared.paused.load(Ordering::SeqCst) {
                        continue;
                    }
                    keepalive.reset();
                    if let Err(e) = ws_tx.send(Message::Binary(frame.to_le_bytes().into())).await {
                        warn!("Audio send failed: {}", e);
                        match self.reconnect(&mut frame_rx).await {
                            ReconnectOutcome::Resumed(tx, rx) => {
                                ws_tx = tx;
                                ws_rx = rx;
                            }
                            ReconnectOutcome::Stopped => {
                                clean_close = true;
                                break 'session;
                            }
                            ReconnectOutcome::Failed => break 'session,
                        }
                    }
                }

                msg = ws_rx.next() => {
                    let abnormal = match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_server_message(&text).await;
                            false
                        }
                        Some(Ok(Message::Close(frame))) => {
                            warn!("Server closed the connection: {:?}", frame);
                            true
                        }
                        Some(Ok(_)) => false,
                        Some(Err(e)) => {
                            warn!("WebSocket error: {}", e);
                            true
                        }
                        None => {
                            warn!("WebSocket stream ended unexpectedly");
                            true
                        }
                    };
                    if abnormal {
                        match self.reconnect(&mut frame_rx).await {
                            ReconnectOutcome::Resumed(tx, rx) => {
                                ws_tx = tx;
                                ws_rx = rx;
                            }
                            ReconnectOutcome::Stopped => {
                                clean_close = true;
                                break 'session;
                            }
                            ReconnectOutcome::Failed => break 'session,
                        }
                    }
                }

                _ = keepalive.tick() => {
                    debug!("Sending keepalive");
                    let _ = ws_tx
                        .send(Message::Text(ControlMessage::KeepAlive.to_json().into()))
                        .await;
                }

                _ = shutdown_rx.changed() => {
                    clean_close = true;
                    break 'session;
                }
            }
        }

        if clean_close {
            self.graceful_close(&mut ws_tx, &mut ws_rx).await;
            self.shared.set_status(ConnectionStatus::Disconnected);
            let _ = self.event_tx.send(SttEvent::Closed).await;
        }

        if let Err(e) = capture.stop().await {
            warn!("Failed to stop capture source: {}", e);
        }
        debug!("Session task finished");
    }

    /// Parse one inbound JSON message. Malformed or unrecognized messages
    /// are logged and dropped; the session keeps running.
    async fn handle_server_message(&mut self, text: &str) {
        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed message ({}): {}", e, truncate(text, 120));
                return;
            }
        };

        match message {
            ServerMessage::Results(results) => {
                let alternative = match results.channel.alternatives.first() {
                    Some(alt) => alt,
                    None => {
                        warn!("Results message with no alternatives");
                        return;
                    }
                };

                if results.is_final {
                    let timestamp_ms = results
                        .start
                        .map(|secs| (secs * 1000.0) as u64)
                        .unwrap_or_else(|| self.elapsed_ms());
                    let segment = lock_ignoring_poison(&self.shared.accumulator).apply_final(
                        &alternative.transcript,
                        alternative.confidence,
                        timestamp_ms,
                    );
                    let _ = self.event_tx.send(SttEvent::Final(segment)).await;
                } else {
                    lock_ignoring_poison(&self.shared.accumulator)
                        .apply_interim(&alternative.transcript);
                    let _ = self
                        .event_tx
                        .send(SttEvent::Interim {
                            text: alternative.transcript.clone(),
                            confidence: alternative.confidence,
                        })
                        .await;
                }
            }
            ServerMessage::Metadata(metadata) => {
                debug!("Metadata: request_id={:?}", metadata.request_id);
            }
            ServerMessage::SpeechStarted(_) => {
                let _ = self.event_tx.send(SttEvent::SpeechStarted).await;
            }
            ServerMessage::UtteranceEnd(_) => {
                let _ = self.event_tx.send(SttEvent::UtteranceEnd).await;
            }
            ServerMessage::Unknown => {
                debug!("Ignoring unrecognized message type: {}", truncate(text, 120));
            }
        }
    }

    /// Handle one abnormal close: one reconnect attempt per close, with a
    /// cumulative cap. A failed attempt loops straight into the next one.
    async fn reconnect(&mut self, frame_rx: &mut mpsc::Receiver<AudioFrame>) -> ReconnectOutcome {
        loop {
            self.reconnect_attempts += 1;
            let attempt = self.reconnect_attempts;

            if attempt > self.config.reconnect.max_attempts {
                error!(
                    "Reconnect attempts exhausted after {} tries",
                    self.config.reconnect.max_attempts
                );
                self.shared.set_status(ConnectionStatus::Failed);
                let _ = self
                    .event_tx
                    .send(SttEvent::Fatal {
                        message: format!(
                            "connection lost and {} reconnect attempts failed",
                            self.config.reconnect.max_attempts
                        ),
                    })
                    .await;
                return ReconnectOutcome::Failed;
            }

            self.shared.set_status(ConnectionStatus::Reconnecting);
            let delay = self.config.reconnect.delay_for(attempt);
            info!("Reconnect attempt {} in {:?}", attempt, delay);
            let _ = self
                .event_tx
                .send(SttEvent::Reconnecting {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                })
                .await;

            if !self.wait_draining_frames(delay, frame_rx).await {
                return ReconnectOutcome::Stopped;
            }

            self.shared.set_status(ConnectionStatus::Connecting);
            match connect_once(&self.config).await {
                Ok(ws) => {
                    info!("Reconnected on attempt {}", attempt);
                    self.shared.set_status(ConnectionStatus::Connected);
                    let _ = self.event_tx.send(SttEvent::Reconnected).await;
                    let (tx, rx) = ws.split();
                    return ReconnectOutcome::Resumed(tx, rx);
                }
                Err(e) => {
                    warn!("Reconnect attempt {} failed: {}", attempt, e);
                }
            }
        }
    }

    /// Sleep out the backoff delay while discarding frames so the capture
    /// channel never backs up. Returns false if shutdown was requested.
    async fn wait_draining_frames(
        &mut self,
        delay: Duration,
        frame_rx: &mut mpsc::Receiver<AudioFrame>,
    ) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        let mut frames_open = true;
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                _ = self.shutdown_rx.changed() => return false,
                frame = frame_rx.recv(), if frames_open => {
                    if frame.is_none() {
                        frames_open = false;
                    }
                }
            }
        }
    }

    async fn graceful_close(&mut self, ws_tx: &mut WsSink, ws_rx: &mut WsSource) {
        debug!("Sending CloseStream");
        if ws_tx
            .send(Message::Text(ControlMessage::CloseStream.to_json().into()))
            .await
            .is_ok()
        {
            // Drain the final flush of results for a short grace period.
            let deadline = tokio::time::sleep(CLOSE_GRACE_PERIOD);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    msg = ws_rx.next() => match msg {
                        Some(Ok(Message::Text(text))) => self.handle_server_message(&text).await,
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            debug!("Socket error during close drain: {}", e);
                            break;
                        }
                    },
                }
            }
        }
        let _ = ws_tx.close().await;
    }

    fn elapsed_ms(&self) -> u64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as u64
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
