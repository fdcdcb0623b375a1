use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::stt::TranscriptSegment;

/// Assumed on-screen duration of one subtitle cue. A presentation
/// convenience, not an audio-alignment guarantee.
const SRT_CUE_DURATION_MS: u64 = 3000;

/// JSON export shape: full text plus per-segment and summary metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptExport {
    pub transcript: String,
    pub metadata: ExportMetadata,
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub word_count: usize,
}

impl TranscriptExport {
    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SessionError::Protocol(format!("export serialization failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json)
            .map_err(|e| SessionError::Protocol(format!("export parse failed: {}", e)))
    }
}

/// Render final segments as sequential SRT cues with a fixed display
/// duration starting at each segment's offset from session start.
pub fn to_srt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        let start = segment.timestamp_ms;
        let end = start + SRT_CUE_DURATION_MS;
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_timestamp(start),
            format_srt_timestamp(end),
            segment.text
        ));
    }
    out
}

/// `HH:MM:SS,mmm` with zero padding.
pub fn format_srt_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
