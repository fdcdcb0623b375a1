use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A finalized transcript segment. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    /// Transcribed text.
    pub text: String,

    /// Always true for segments in the final list; kept for export parity.
    pub is_final: bool,

    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,

    /// Offset from session start in milliseconds.
    pub timestamp_ms: u64,

    /// Wall-clock arrival time.
    pub received_at: DateTime<Utc>,
}

/// Accumulates interim and final results for one session.
///
/// Interim text is replaced wholesale by each interim message and cleared
/// when a final arrives. Finals are appended in arrival order; the full
/// transcript is their space-joined concatenation, skipping empty segments
/// so no doubled or leading spaces appear.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    interim: String,
    segments: Vec<TranscriptSegment>,
    transcript: String,
    interim_count: u64,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (never append to) the current interim text.
    pub fn apply_interim(&mut self, text: &str) {
        self.interim.clear();
        self.interim.push_str(text);
        self.interim_count += 1;
    }

    /// Append a final segment and clear the interim text.
    pub fn apply_final(&mut self, text: &str, confidence: f32, timestamp_ms: u64) -> TranscriptSegment {
        let segment = TranscriptSegment {
            text: text.to_string(),
            is_final: true,
            confidence,
            timestamp_ms,
            received_at: Utc::now(),
        };
        self.append_segment(segment.clone());
        segment
    }

    /// Append an already-built final segment, extending the joined
    /// transcript and clearing the interim text.
    pub fn append_segment(&mut self, segment: TranscriptSegment) {
        if !segment.text.is_empty() {
            if !self.transcript.is_empty() {
                self.transcript.push(' ');
            }
            self.transcript.push_str(&segment.text);
        }
        self.segments.push(segment);
        self.interim.clear();
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn interim_count(&self) -> u64 {
        self.interim_count
    }

    /// Whitespace-token count across all finals. Approximate by design.
    pub fn word_count(&self) -> usize {
        self.transcript.split_whitespace().count()
    }
}
