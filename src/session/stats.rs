use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cross-cutting counters accumulated across one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whitespace-token count over finalized segments. Approximate by
    /// design, not a linguistic word count.
    pub word_count: usize,

    /// Number of finalized segments.
    pub final_count: usize,

    /// Number of interim updates received.
    pub interim_count: usize,

    /// Errors observed (recoverable and fatal).
    pub error_count: usize,

    /// When the session started, if one has.
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds since the session started.
    pub duration_secs: f64,
}

impl SessionStats {
    pub fn refresh_duration(&mut self) {
        if let Some(started_at) = self.started_at {
            self.duration_secs = (Utc::now() - started_at).num_milliseconds() as f64 / 1000.0;
        }
    }
}
