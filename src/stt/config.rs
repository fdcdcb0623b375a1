use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::TARGET_SAMPLE_RATE;
use crate::error::SessionError;

/// Connection parameters for the streaming STT endpoint.
///
/// Everything except the credential is encoded as query parameters on the
/// WebSocket URL; the credential travels in an `Authorization: Token` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// WebSocket endpoint, e.g. "wss://api.deepgram.com/v1/listen".
    pub endpoint: String,

    /// Authentication token. Required; validated before any network attempt.
    pub api_key: String,

    /// BCP-47 locale tag for recognition.
    pub language: String,

    /// Named recognition model variant.
    pub model: String,

    /// Request automatic punctuation.
    pub punctuate: bool,

    /// Request partial results before finalization.
    pub interim_results: bool,

    /// Server-side silence duration (ms) before an utterance is considered
    /// ended.
    pub endpointing_ms: u32,

    /// Request voice-activity-detection events.
    pub vad_events: bool,

    /// PCM sample rate sent on the wire. Must match the capture output
    /// exactly; a mismatch garbles audio without any protocol error.
    pub sample_rate: u32,

    /// Hard cutoff for the WebSocket handshake.
    #[serde(skip, default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://api.deepgram.com/v1/listen".to_string(),
            api_key: String::new(),
            language: "en-US".to_string(),
            model: "nova-2".to_string(),
            punctuate: true,
            interim_results: true,
            endpointing_ms: 300,
            vad_events: false,
            sample_rate: TARGET_SAMPLE_RATE,
            connect_timeout: default_connect_timeout(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SttConfig {
    /// Fail fast on a missing credential or malformed options. Called before
    /// any network activity.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.api_key.trim().is_empty() {
            return Err(SessionError::Configuration(
                "no API key configured (set VOXSTREAM_API_KEY or [stt].api_key)".to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(SessionError::Configuration("empty endpoint URL".to_string()));
        }
        // These are interpolated into the query string unescaped, so reject
        // anything that would need encoding
        if !is_query_safe(&self.language) {
            return Err(SessionError::Configuration(format!(
                "invalid language tag {:?}",
                self.language
            )));
        }
        if !is_query_safe(&self.model) {
            return Err(SessionError::Configuration(format!(
                "invalid model name {:?}",
                self.model
            )));
        }
        Ok(())
    }

    /// Full WebSocket URL with the vendor's recognized query options.
    pub fn websocket_url(&self) -> String {
        format!(
            "{}?language={}&model={}&encoding=linear16&sample_rate={}&channels=1&punctuate={}&interim_results={}&endpointing={}&vad_events={}",
            self.endpoint,
            self.language,
            self.model,
            self.sample_rate,
            self.punctuate,
            self.interim_results,
            self.endpointing_ms,
            self.vad_events,
        )
    }
}

fn is_query_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Linear backoff between reconnect attempts: `base_delay × attempt`, with a
/// hard attempt cap. Not a general resilience framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given 1-based attempt number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
