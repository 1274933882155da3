//! Device-facing protocol surface
//!
//! The owning application drives a [`Protocol`] with microphone packets and
//! text commands, and receives [`ProtocolEvent`]s back over an mpsc channel.

mod adapter;

use async_trait::async_trait;

pub use adapter::{AdapterSettings, CloudVoiceAdapter, FlushOutcome, SendOutcome};

use crate::Result;

/// A packet of encoded audio travelling to or from the device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioStreamPacket {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Frame duration in milliseconds
    pub frame_duration: u32,

    /// Capture timestamp in milliseconds (0 when unused)
    pub timestamp: u32,

    /// Encoded audio bytes
    pub payload: Vec<u8>,
}

impl AudioStreamPacket {
    /// Wrap a payload with no timing metadata
    #[must_use]
    pub fn from_payload(payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }
}

/// Notification delivered to the owning application
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// The audio channel was opened
    AudioChannelOpened,

    /// The audio channel was closed
    AudioChannelClosed,

    /// A status/text event (`stt` transcript or `llm` reply)
    IncomingJson(serde_json::Value),

    /// Synthesized speech for playback
    IncomingAudio(AudioStreamPacket),
}

/// Contract between the device application and a cloud backend
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Check the backend is usable before the first channel is opened
    ///
    /// # Errors
    ///
    /// Returns error if required configuration is missing
    fn start(&self) -> Result<()>;

    /// Open the audio channel and start a new session
    ///
    /// # Errors
    ///
    /// Returns error if the channel cannot be opened
    async fn open_audio_channel(&self) -> Result<()>;

    /// Close the audio channel, discarding unflushed audio
    async fn close_audio_channel(&self);

    /// Whether the audio channel is open
    fn is_audio_channel_opened(&self) -> bool;

    /// Feed a microphone packet
    ///
    /// # Errors
    ///
    /// Returns error only if the packet cannot be accepted; pipeline failures
    /// are reported through the returned [`SendOutcome`]
    async fn send_audio(&self, packet: AudioStreamPacket) -> Result<SendOutcome>;

    /// Handle a JSON text command from the device
    ///
    /// # Errors
    ///
    /// Returns error for malformed JSON or unsupported commands
    fn send_text(&self, text: &str) -> Result<()>;

    /// Handshake payload sent when a connection is established
    fn hello_message(&self) -> String {
        "{}".to_string()
    }
}
