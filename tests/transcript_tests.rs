use chrono::Utc;

use voxstream::session::{format_srt_timestamp, to_srt, SessionState, TranscriptExport};
use voxstream::stt::{TranscriptAccumulator, TranscriptSegment};

fn segment(text: &str, timestamp_ms: u64) -> TranscriptSegment {
    TranscriptSegment {
        text: text.to_string(),
        is_final: true,
        confidence: 0.95,
        timestamp_ms,
        received_at: Utc::now(),
    }
}

#[test]
fn finals_join_with_single_spaces() {
    let mut acc = TranscriptAccumulator::new();
    acc.apply_final("Hello world.", 0.99, 0);
    acc.apply_final("How are you?", 0.97, 2000);
    assert_eq!(acc.transcript(), "Hello world. How are you?");
    assert_eq!(acc.word_count(), 5);
    assert_eq!(acc.segments().len(), 2);
}

#[test]
fn empty_finals_never_produce_stray_spaces() {
    let mut acc = TranscriptAccumulator::new();
    acc.apply_final("", 0.0, 0);
    acc.apply_final("first", 0.9, 1000);
    acc.apply_final("", 0.0, 2000);
    acc.apply_final("second", 0.9, 3000);
    assert_eq!(acc.transcript(), "first second");
    // Empty segments are still recorded, they just contribute no text
    assert_eq!(acc.segments().len(), 4);
}

#[test]
fn interim_replaces_and_a_final_clears_it() {
    let mut acc = TranscriptAccumulator::new();
    acc.apply_interim("hel");
    acc.apply_interim("hello wor");
    assert_eq!(acc.interim(), "hello wor");
    assert_eq!(acc.interim_count(), 2);
    assert_eq!(acc.transcript(), "");

    acc.apply_final("hello world.", 0.98, 0);
    assert_eq!(acc.interim(), "");
    assert_eq!(acc.transcript(), "hello world.");
}

#[test]
fn srt_timestamps_are_zero_padded() {
    assert_eq!(format_srt_timestamp(0), "00:00:00,000");
    assert_eq!(format_srt_timestamp(3_723_456), "01:02:03,456");
    assert_eq!(format_srt_timestamp(59_999), "00:00:59,999");
}

#[test]
fn srt_export_numbers_cues_from_one() {
    let srt = to_srt(&[segment("Hello world.", 0), segment("Goodbye.", 4500)]);
    assert_eq!(
        srt,
        "1\n00:00:00,000 --> 00:00:03,000\nHello world.\n\n\
         2\n00:00:04,500 --> 00:00:07,500\nGoodbye.\n\n"
    );
}

#[test]
fn json_export_round_trips() {
    let export = TranscriptExport {
        transcript: "Hello world.".to_string(),
        metadata: voxstream::session::ExportMetadata {
            session_id: "abc-123".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            word_count: 2,
        },
        segments: vec![segment("Hello world.", 0)],
    };

    let json = export.to_json().unwrap();
    assert!(json.contains("\"sessionId\""));
    assert!(json.contains("\"wordCount\""));

    let parsed = TranscriptExport::from_json(&json).unwrap();
    assert_eq!(parsed.transcript, "Hello world.");
    assert_eq!(parsed.metadata.session_id, "abc-123");
    assert_eq!(parsed.segments, export.segments);
}

#[test]
fn state_machine_edges() {
    use SessionState::*;

    assert!(Idle.can_transition_to(Initializing));
    assert!(Initializing.can_transition_to(Active));
    assert!(Active.can_transition_to(Paused));
    assert!(Paused.can_transition_to(Active));
    assert!(Paused.can_transition_to(Stopping));
    assert!(Stopping.can_transition_to(Idle));
    assert!(Error.can_transition_to(Idle));

    // No shortcuts into or out of the lifecycle
    assert!(!Idle.can_transition_to(Active));
    assert!(!Paused.can_transition_to(Idle));
    assert!(!Error.can_transition_to(Active));
    assert!(!Stopping.can_transition_to(Active));
    assert!(!Idle.can_transition_to(Error));
}
