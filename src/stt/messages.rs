use serde::{Deserialize, Serialize};

/// Inbound messages from the STT endpoint.
///
/// Only `Results` carries transcript data; everything else is tolerated and
/// logged. Genuinely unknown types fall into `Unknown` instead of failing
/// the parse.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    Results(ResultsMessage),
    Metadata(MetadataMessage),
    UtteranceEnd(UtteranceEndMessage),
    SpeechStarted(SpeechStartedMessage),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct ResultsMessage {
    #[serde(default)]
    pub is_final: bool,
    pub channel: ResultsChannel,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub start: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ResultsChannel {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
pub struct MetadataMessage {
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UtteranceEndMessage {
    #[serde(default)]
    pub last_word_end: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SpeechStartedMessage {
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Outbound JSON control messages.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Graceful end-of-stream: the server flushes pending results before the
    /// socket closes.
    CloseStream,
    /// Keeps an idle connection open while no audio is flowing.
    KeepAlive,
}

impl ControlMessage {
    pub fn to_json(self) -> String {
        // Serialization of a unit-tagged enum cannot fail.
        serde_json::to_string(&self).unwrap_or_default()
    }
}
