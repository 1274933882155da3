//! Adapter pipeline integration tests
//!
//! Drives the adapter with scripted services, no network required

use std::sync::Arc;
use std::time::Duration;

use cloud_voice_adapter::config::ConfigFile;
use cloud_voice_adapter::{
    AdapterSettings, AudioStreamPacket, CloudVoiceAdapter, Config, FlushOutcome, Protocol,
    ProtocolEvent, SendOutcome,
};
use serde_json::json;
use tokio::sync::mpsc;

mod common;
use common::{ScriptedLlm, ScriptedStt, ScriptedTts};

fn build(
    stt: &Arc<ScriptedStt>,
    llm: &Arc<ScriptedLlm>,
    tts: &Arc<ScriptedTts>,
) -> (CloudVoiceAdapter, mpsc::Receiver<ProtocolEvent>) {
    CloudVoiceAdapter::with_receiver(
        stt.clone(),
        llm.clone(),
        tts.clone(),
        AdapterSettings::default(),
    )
}

fn drain(rx: &mut mpsc::Receiver<ProtocolEvent>) -> Vec<ProtocolEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn packet(len: usize) -> AudioStreamPacket {
    AudioStreamPacket::from_payload(vec![0x5a; len])
}

#[tokio::test]
async fn test_empty_transcript_stops_pipeline() {
    let stt = Arc::new(ScriptedStt::replying(""));
    let llm = Arc::new(ScriptedLlm::replying("unused"));
    let tts = Arc::new(ScriptedTts::replying(&[1]));
    let (adapter, mut rx) = build(&stt, &llm, &tts);

    let first = adapter.send_audio(packet(12_000)).await.unwrap();
    assert_eq!(first, SendOutcome::Buffered { buffered: 12_000 });

    let second = adapter.send_audio(packet(8_000)).await.unwrap();
    assert_eq!(
        second,
        SendOutcome::Flushed {
            audio_bytes: 20_000,
            outcome: FlushOutcome::NoTranscript,
        }
    );

    assert_eq!(stt.call_lengths(), vec![20_000]);
    assert!(llm.prompts().is_empty());
    assert!(tts.texts().is_empty());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(adapter.buffered_len().await, 0);
}

#[tokio::test]
async fn test_full_pipeline_emits_events_in_order() {
    let stt = Arc::new(ScriptedStt::replying("今天天气怎么样"));
    let llm = Arc::new(ScriptedLlm::replying("今天晴天"));
    let tts = Arc::new(ScriptedTts::replying(&[9, 8, 7, 6]));
    let (adapter, mut rx) = build(&stt, &llm, &tts);

    let outcome = adapter.send_audio(packet(16_001)).await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Flushed {
            audio_bytes: 16_001,
            outcome: FlushOutcome::Delivered {
                transcript: "今天天气怎么样".to_string(),
                reply: "今天晴天".to_string(),
                audio_bytes: 4,
            },
        }
    );

    assert_eq!(llm.prompts(), vec!["今天天气怎么样".to_string()]);
    assert_eq!(tts.texts(), vec!["今天晴天".to_string()]);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        ProtocolEvent::IncomingJson(json!({"type": "stt", "text": "今天天气怎么样"}))
    );
    assert_eq!(
        events[1],
        ProtocolEvent::IncomingJson(json!({
            "type": "llm",
            "emotion": "neutral",
            "content": {"text": "今天晴天"},
        }))
    );
    match &events[2] {
        ProtocolEvent::IncomingAudio(packet) => {
            assert_eq!(packet.payload, vec![9, 8, 7, 6]);
            assert_eq!(packet.sample_rate, 16_000);
            assert_eq!(packet.frame_duration, 60);
        }
        other => panic!("expected audio packet, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_reply_skips_synthesis() {
    let stt = Arc::new(ScriptedStt::replying("hello"));
    let llm = Arc::new(ScriptedLlm::replying(""));
    let tts = Arc::new(ScriptedTts::replying(&[1]));
    let (adapter, mut rx) = build(&stt, &llm, &tts);

    let outcome = adapter.send_audio(packet(20_000)).await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Flushed {
            audio_bytes: 20_000,
            outcome: FlushOutcome::NoReply {
                transcript: "hello".to_string(),
            },
        }
    );

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(tts.texts().is_empty());
}

#[tokio::test]
async fn test_stage_failures_degrade_quietly() {
    let stt = Arc::new(ScriptedStt::failing());
    let llm = Arc::new(ScriptedLlm::replying("unused"));
    let tts = Arc::new(ScriptedTts::replying(&[1]));
    let (adapter, mut rx) = build(&stt, &llm, &tts);

    let outcome = adapter.send_audio(packet(20_000)).await;
    assert!(matches!(
        outcome,
        Ok(SendOutcome::Flushed {
            outcome: FlushOutcome::NoTranscript,
            ..
        })
    ));
    assert!(drain(&mut rx).is_empty());

    let stt = Arc::new(ScriptedStt::replying("hello"));
    let llm = Arc::new(ScriptedLlm::failing());
    let (adapter, mut rx) = build(&stt, &llm, &tts);

    let outcome = adapter.send_audio(packet(20_000)).await.unwrap();
    assert!(matches!(
        outcome,
        SendOutcome::Flushed {
            outcome: FlushOutcome::NoReply { .. },
            ..
        }
    ));
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn test_synthesis_failure_emits_text_only() {
    let stt = Arc::new(ScriptedStt::replying("hello"));
    let llm = Arc::new(ScriptedLlm::replying("hi there"));
    let tts = Arc::new(ScriptedTts::failing());
    let (adapter, mut rx) = build(&stt, &llm, &tts);

    let outcome = adapter.send_audio(packet(20_000)).await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Flushed {
            audio_bytes: 20_000,
            outcome: FlushOutcome::SynthesisFailed {
                transcript: "hello".to_string(),
                reply: "hi there".to_string(),
            },
        }
    );

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(
        events
            .iter()
            .all(|e| matches!(e, ProtocolEvent::IncomingJson(_)))
    );
}

#[tokio::test]
async fn test_channel_lifecycle() {
    let stt = Arc::new(ScriptedStt::replying(""));
    let llm = Arc::new(ScriptedLlm::replying(""));
    let tts = Arc::new(ScriptedTts::replying(&[]));
    let (adapter, mut rx) = build(&stt, &llm, &tts);

    assert!(!adapter.is_audio_channel_opened());

    adapter.open_audio_channel().await.unwrap();
    assert!(adapter.is_audio_channel_opened());
    let first_session = adapter.session_id().await;
    assert!(first_session.is_some());

    adapter.send_audio(packet(5_000)).await.unwrap();
    assert_eq!(adapter.buffered_len().await, 5_000);

    adapter.close_audio_channel().await;
    assert!(!adapter.is_audio_channel_opened());
    assert_eq!(adapter.buffered_len().await, 0);

    // Closing again must not fault and still discards audio
    adapter.send_audio(packet(3_000)).await.unwrap();
    adapter.close_audio_channel().await;
    assert!(!adapter.is_audio_channel_opened());
    assert_eq!(adapter.buffered_len().await, 0);

    assert_eq!(
        drain(&mut rx),
        vec![
            ProtocolEvent::AudioChannelOpened,
            ProtocolEvent::AudioChannelClosed,
            ProtocolEvent::AudioChannelClosed,
        ]
    );
    assert!(stt.call_lengths().is_empty());
}

#[tokio::test]
async fn test_reopen_starts_new_session() {
    let stt = Arc::new(ScriptedStt::replying(""));
    let llm = Arc::new(ScriptedLlm::replying(""));
    let tts = Arc::new(ScriptedTts::replying(&[]));
    let (adapter, _rx) = build(&stt, &llm, &tts);

    let mut sessions = Vec::new();
    for _ in 0..5 {
        adapter.open_audio_channel().await.unwrap();
        sessions.push(adapter.session_id().await.unwrap());
        adapter.close_audio_channel().await;
    }

    sessions.sort();
    sessions.dedup();
    // Random u32 ids; a collision in five draws is practically impossible
    assert!(sessions.len() > 1);
}

#[tokio::test]
async fn test_concurrent_senders_never_lose_audio() {
    let stt = Arc::new(ScriptedStt::replying(""));
    let llm = Arc::new(ScriptedLlm::replying(""));
    let tts = Arc::new(ScriptedTts::replying(&[]));
    let adapter = Arc::new(CloudVoiceAdapter::new(
        stt.clone(),
        llm,
        tts,
        AdapterSettings::default(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let adapter = Arc::clone(&adapter);
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                adapter.send_audio(packet(960)).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let flushed: usize = stt.call_lengths().iter().sum();
    let buffered = adapter.buffered_len().await;
    assert_eq!(flushed + buffered, 8 * 25 * 960);
    assert!(stt.call_lengths().iter().all(|len| *len > 16_000));
    assert!(buffered <= 16_000);
}

#[tokio::test]
async fn test_events_without_receiver_are_dropped() {
    let stt = Arc::new(ScriptedStt::replying("hello"));
    let llm = Arc::new(ScriptedLlm::replying("hi"));
    let tts = Arc::new(ScriptedTts::replying(&[1, 2]));
    let adapter = CloudVoiceAdapter::new(stt, llm, tts, AdapterSettings::default());

    adapter.open_audio_channel().await.unwrap();
    let outcome = adapter.send_audio(packet(20_000)).await.unwrap();
    assert!(matches!(
        outcome,
        SendOutcome::Flushed {
            outcome: FlushOutcome::Delivered { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_undrained_receiver_never_blocks_senders() {
    let stt = Arc::new(ScriptedStt::replying("hello"));
    let llm = Arc::new(ScriptedLlm::replying("hi"));
    let tts = Arc::new(ScriptedTts::replying(&[1, 2]));
    let (adapter, mut rx) = build(&stt, &llm, &tts);

    // Three events per flush; the receiver is only read afterwards
    for round in 0..40 {
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            adapter.send_audio(packet(16_001)),
        )
        .await
            .unwrap_or_else(|_| panic!("send_audio blocked on flush {round}"))
        .unwrap();
        assert!(matches!(
            outcome,
            SendOutcome::Flushed {
                outcome: FlushOutcome::Delivered { .. },
                ..
            }
        ));
    }
    assert_eq!(stt.call_lengths().len(), 40);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 100);
    assert_eq!(
        events[0],
        ProtocolEvent::IncomingJson(json!({"type": "stt", "text": "hello"}))
    );
}

#[tokio::test]
async fn test_custom_threshold_from_config() {
    let fc: ConfigFile = toml::from_str(
        r"
        [audio]
        flush_threshold = 100
        output_frame_duration = 20
        ",
    )
    .unwrap();
    let config = Config::resolve(fc, |_| None);
    let settings = AdapterSettings::from(&config);

    let stt = Arc::new(ScriptedStt::replying("a"));
    let llm = Arc::new(ScriptedLlm::replying("b"));
    let tts = Arc::new(ScriptedTts::replying(&[3]));
    let (adapter, mut rx) =
        CloudVoiceAdapter::with_receiver(stt.clone(), llm, tts, settings);

    assert!(matches!(
        adapter.send_audio(packet(101)).await.unwrap(),
        SendOutcome::Flushed { audio_bytes: 101, .. }
    ));
    let audio = drain(&mut rx)
        .into_iter()
        .find_map(|e| match e {
            ProtocolEvent::IncomingAudio(p) => Some(p),
            _ => None,
        })
        .unwrap();
    assert_eq!(audio.frame_duration, 20);
}

#[tokio::test]
async fn test_start_requires_credentials() {
    let config = Config::resolve(ConfigFile::default(), |_| None);
    let (adapter, _rx) = CloudVoiceAdapter::from_config(&config).await.unwrap();

    let err = adapter.start().unwrap_err();
    assert!(err.to_string().contains("baidu_api_key"));
    assert_eq!(adapter.hello_message(), "{}");
}
