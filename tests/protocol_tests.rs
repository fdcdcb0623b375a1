use std::time::Duration;

use voxstream::error::SessionError;
use voxstream::stt::{ControlMessage, ReconnectPolicy, ServerMessage, SttConfig};

#[test]
fn parses_interim_results() {
    let json = r#"{
        "type": "Results",
        "is_final": false,
        "start": 0.0,
        "duration": 1.02,
        "channel": {
            "alternatives": [
                {"transcript": "hello wor", "confidence": 0.84}
            ]
        }
    }"#;

    match serde_json::from_str::<ServerMessage>(json).unwrap() {
        ServerMessage::Results(results) => {
            assert!(!results.is_final);
            let alt = &results.channel.alternatives[0];
            assert_eq!(alt.transcript, "hello wor");
            assert!((alt.confidence - 0.84).abs() < 1e-6);
        }
        other => panic!("expected Results, got {:?}", other),
    }
}

#[test]
fn parses_final_results_with_defaults() {
    // No is_final or confidence fields at all
    let json = r#"{
        "type": "Results",
        "channel": {"alternatives": [{"transcript": "ok"}]}
    }"#;

    match serde_json::from_str::<ServerMessage>(json).unwrap() {
        ServerMessage::Results(results) => {
            assert!(!results.is_final);
            assert_eq!(results.channel.alternatives[0].confidence, 0.0);
            assert!(results.start.is_none());
        }
        other => panic!("expected Results, got {:?}", other),
    }
}

#[test]
fn parses_metadata_and_vad_messages() {
    let metadata = r#"{"type": "Metadata", "request_id": "req-1"}"#;
    assert!(matches!(
        serde_json::from_str::<ServerMessage>(metadata).unwrap(),
        ServerMessage::Metadata(_)
    ));

    let utterance = r#"{"type": "UtteranceEnd", "last_word_end": 3.1}"#;
    assert!(matches!(
        serde_json::from_str::<ServerMessage>(utterance).unwrap(),
        ServerMessage::UtteranceEnd(_)
    ));

    let speech = r#"{"type": "SpeechStarted", "timestamp": 0.5}"#;
    assert!(matches!(
        serde_json::from_str::<ServerMessage>(speech).unwrap(),
        ServerMessage::SpeechStarted(_)
    ));
}

#[test]
fn unrecognized_message_types_parse_as_unknown() {
    let json = r#"{"type": "SomethingNew", "payload": 7}"#;
    assert!(matches!(
        serde_json::from_str::<ServerMessage>(json).unwrap(),
        ServerMessage::Unknown
    ));
}

#[test]
fn messages_without_a_type_fail_to_parse() {
    assert!(serde_json::from_str::<ServerMessage>(r#"{"transcript": "x"}"#).is_err());
    assert!(serde_json::from_str::<ServerMessage>("not json").is_err());
}

#[test]
fn control_messages_serialize_as_tagged_json() {
    assert_eq!(ControlMessage::CloseStream.to_json(), r#"{"type":"CloseStream"}"#);
    assert_eq!(ControlMessage::KeepAlive.to_json(), r#"{"type":"KeepAlive"}"#);
}

#[test]
fn websocket_url_carries_the_recognition_options() {
    let config = SttConfig {
        api_key: "key".to_string(),
        ..Default::default()
    };
    let url = config.websocket_url();

    assert!(url.starts_with("wss://api.deepgram.com/v1/listen?"));
    assert!(url.contains("language=en-US"));
    assert!(url.contains("model=nova-2"));
    assert!(url.contains("encoding=linear16"));
    assert!(url.contains("sample_rate=16000"));
    assert!(url.contains("channels=1"));
    assert!(url.contains("punctuate=true"));
    assert!(url.contains("interim_results=true"));
    assert!(url.contains("endpointing=300"));
    assert!(url.contains("vad_events=false"));
}

#[test]
fn validation_rejects_a_missing_api_key() {
    let config = SttConfig::default();
    assert!(matches!(
        config.validate(),
        Err(SessionError::Configuration(_))
    ));

    let config = SttConfig {
        api_key: "  ".to_string(),
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let config = SttConfig {
        api_key: "real-key".to_string(),
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn validation_rejects_values_that_would_corrupt_the_query_string() {
    let config = SttConfig {
        api_key: "key".to_string(),
        language: "en US".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(SessionError::Configuration(_))
    ));

    let config = SttConfig {
        api_key: "key".to_string(),
        model: "nova&2=general".to_string(),
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let config = SttConfig {
        api_key: "key".to_string(),
        language: "pt-BR".to_string(),
        model: "nova-2.1_beta".to_string(),
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn reconnect_backoff_is_linear_in_the_attempt_number() {
    let policy = ReconnectPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1000),
    };
    assert_eq!(policy.delay_for(1), Duration::from_secs(1));
    assert_eq!(policy.delay_for(2), Duration::from_secs(2));
    assert_eq!(policy.delay_for(3), Duration::from_secs(3));
}
