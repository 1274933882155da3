//! Cloud voice adapter: buffer, transcribe, answer, speak
//!
//! Audio accumulates until the buffer grows past the flush threshold. The
//! drained buffer then runs through STT, the LLM and TTS in sequence on the
//! caller's task. An empty or failed stage ends the flush quietly; the
//! [`SendOutcome`] tells the caller how far it got.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};

use super::{AudioStreamPacket, Protocol, ProtocolEvent};
use crate::config::{Config, DEFAULT_FLUSH_THRESHOLD};
use crate::services::{CloudServices, LanguageModel, SpeechRecognizer, SpeechSynthesizer};
use crate::{Error, Result};

/// Event channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Buffering and output packet settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSettings {
    /// Flush once the buffer holds more than this many bytes
    pub flush_threshold: usize,

    /// Sample rate stamped on synthesized packets
    pub output_sample_rate: u32,

    /// Frame duration (ms) stamped on synthesized packets
    pub output_frame_duration: u32,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            output_sample_rate: 16_000,
            output_frame_duration: 60,
        }
    }
}

impl From<&Config> for AdapterSettings {
    fn from(config: &Config) -> Self {
        Self {
            flush_threshold: config.audio.flush_threshold,
            output_sample_rate: config.audio.output_sample_rate,
            output_frame_duration: config.audio.output_frame_duration,
        }
    }
}

/// Result of feeding one audio packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Audio was buffered; no flush yet
    Buffered {
        /// Bytes currently buffered
        buffered: usize,
    },

    /// The buffer crossed the threshold and was flushed
    Flushed {
        /// Bytes handed to STT
        audio_bytes: usize,
        /// How far the pipeline got
        outcome: FlushOutcome,
    },
}

/// How far a flush got through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// STT produced nothing (or failed); nothing was emitted
    NoTranscript,

    /// The transcript was emitted but the LLM produced nothing
    NoReply { transcript: String },

    /// Both events were emitted but synthesis failed
    SynthesisFailed { transcript: String, reply: String },

    /// Synthesized audio was emitted
    Delivered {
        transcript: String,
        reply: String,
        audio_bytes: usize,
    },
}

/// Bridges a device audio pipeline to cloud STT, LLM and TTS services
pub struct CloudVoiceAdapter {
    stt: Arc<dyn SpeechRecognizer>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn SpeechSynthesizer>,
    settings: AdapterSettings,
    events: Option<mpsc::Sender<ProtocolEvent>>,
    missing_credentials: Vec<&'static str>,
    opened: AtomicBool,
    session_id: Mutex<Option<String>>,
    audio_buffer: Mutex<Vec<u8>>,
}

impl CloudVoiceAdapter {
    /// Create an adapter over the given services with no event receiver
    #[must_use]
    pub fn new(
        stt: Arc<dyn SpeechRecognizer>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn SpeechSynthesizer>,
        settings: AdapterSettings,
    ) -> Self {
        Self {
            stt,
            llm,
            tts,
            settings,
            events: None,
            missing_credentials: Vec::new(),
            opened: AtomicBool::new(false),
            session_id: Mutex::new(None),
            audio_buffer: Mutex::new(Vec::new()),
        }
    }

    /// Create an adapter and the receiver for its events
    #[must_use]
    pub fn with_receiver(
        stt: Arc<dyn SpeechRecognizer>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn SpeechSynthesizer>,
        settings: AdapterSettings,
    ) -> (Self, mpsc::Receiver<ProtocolEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut adapter = Self::new(stt, llm, tts, settings);
        adapter.events = Some(tx);
        (adapter, rx)
    }

    /// Wire Baidu STT/TTS and Gemini from configuration
    ///
    /// Attempts one eager token refresh; a failure is only logged since the
    /// first STT or TTS call retries it.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub async fn from_config(config: &Config) -> Result<(Self, mpsc::Receiver<ProtocolEvent>)> {
        let services = CloudServices::from_config(config)?;

        let missing = config.credentials.missing();
        if missing.contains(&"baidu_api_key") || missing.contains(&"baidu_secret_key") {
            tracing::warn!("Baidu credentials not configured, skipping token refresh");
        } else if let Err(e) = services.tokens.refresh().await {
            tracing::warn!(error = %e, "initial Baidu token refresh failed");
        }

        let (mut adapter, rx) = Self::with_receiver(
            services.stt,
            services.llm,
            services.tts,
            AdapterSettings::from(config),
        );
        adapter.missing_credentials = missing;
        Ok((adapter, rx))
    }

    /// Identifier of the current (or last) session
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.lock().await.clone()
    }

    /// Bytes currently waiting in the audio buffer
    pub async fn buffered_len(&self) -> usize {
        self.audio_buffer.lock().await.len()
    }

    /// Active settings
    #[must_use]
    pub const fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// Queue an event without waiting; a full or closed channel drops it
    fn emit(&self, event: ProtocolEvent) {
        let Some(tx) = &self.events else {
            tracing::trace!("no event receiver attached, dropping event");
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    capacity = EVENT_CHANNEL_CAPACITY,
                    "event channel full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("event receiver closed, dropping event");
            }
        }
    }

    /// Run one drained buffer through STT, LLM and TTS
    async fn flush(&self, audio: Vec<u8>) -> FlushOutcome {
        tracing::debug!(audio_bytes = audio.len(), stt = self.stt.name(), "flushing audio buffer");

        let transcript = self.stt.transcribe(&audio).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "speech recognition failed");
            String::new()
        });
        if transcript.is_empty() {
            return FlushOutcome::NoTranscript;
        }

        self.emit(ProtocolEvent::IncomingJson(json!({
            "type": "stt",
            "text": transcript,
        })));

        let reply = self.llm.generate(&transcript).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, llm = self.llm.name(), "language model query failed");
            String::new()
        });
        if reply.is_empty() {
            return FlushOutcome::NoReply { transcript };
        }

        self.emit(ProtocolEvent::IncomingJson(json!({
            "type": "llm",
            "emotion": "neutral",
            "content": { "text": reply },
        })));

        match self.tts.synthesize(&reply).await {
            Ok(speech) => {
                let audio_bytes = speech.len();
                self.emit(ProtocolEvent::IncomingAudio(AudioStreamPacket {
                    sample_rate: self.settings.output_sample_rate,
                    frame_duration: self.settings.output_frame_duration,
                    timestamp: 0,
                    payload: speech,
                }));
                FlushOutcome::Delivered {
                    transcript,
                    reply,
                    audio_bytes,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, tts = self.tts.name(), "speech synthesis failed");
                FlushOutcome::SynthesisFailed { transcript, reply }
            }
        }
    }
}

#[async_trait]
impl Protocol for CloudVoiceAdapter {
    fn start(&self) -> Result<()> {
        if self.missing_credentials.is_empty() {
            return Ok(());
        }
        tracing::error!(missing = ?self.missing_credentials, "API keys not configured");
        Err(Error::Config(format!(
            "API keys not configured: {}",
            self.missing_credentials.join(", ")
        )))
    }

    async fn open_audio_channel(&self) -> Result<()> {
        let session_id = format!("{:08X}", rand::random::<u32>());
        tracing::info!(session_id = %session_id, "audio channel opened");

        *self.session_id.lock().await = Some(session_id);
        self.opened.store(true, Ordering::SeqCst);
        self.emit(ProtocolEvent::AudioChannelOpened);
        Ok(())
    }

    async fn close_audio_channel(&self) {
        self.opened.store(false, Ordering::SeqCst);

        let discarded = {
            let mut buffer = self.audio_buffer.lock().await;
            let len = buffer.len();
            buffer.clear();
            len
        };
        tracing::info!(discarded_bytes = discarded, "audio channel closed");

        self.emit(ProtocolEvent::AudioChannelClosed);
    }

    fn is_audio_channel_opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    async fn send_audio(&self, packet: AudioStreamPacket) -> Result<SendOutcome> {
        let drained = {
            let mut buffer = self.audio_buffer.lock().await;
            buffer.extend_from_slice(&packet.payload);
            if buffer.len() <= self.settings.flush_threshold {
                return Ok(SendOutcome::Buffered {
                    buffered: buffer.len(),
                });
            }
            std::mem::take(&mut *buffer)
        };

        let audio_bytes = drained.len();
        let outcome = self.flush(drained).await;
        tracing::debug!(audio_bytes, outcome = ?outcome, "flush finished");

        Ok(SendOutcome::Flushed {
            audio_bytes,
            outcome,
        })
    }

    fn send_text(&self, text: &str) -> Result<()> {
        let command: Value = serde_json::from_str(text)
            .map_err(|e| Error::Protocol(format!("invalid text command: {e}")))?;
        let Some(fields) = command.as_object() else {
            return Err(Error::Protocol(
                "text command must be a JSON object".to_string(),
            ));
        };

        let field = |name: &str| fields.get(name).and_then(Value::as_str);
        match (field("type"), field("state")) {
            (Some("listen"), Some("detect")) => {
                tracing::info!("wake word detected");
                Ok(())
            }
            (kind, state) => Err(Error::Protocol(format!(
                "unsupported text command (type={kind:?}, state={state:?})"
            ))),
        }
    }
}
