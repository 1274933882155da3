//! Cloud Voice Adapter - cloud STT, LLM and TTS for embedded voice assistants
//!
//! Bridges a device's audio pipeline to three hosted services:
//! - Baidu speech recognition (STT)
//! - Google Gemini (LLM)
//! - Baidu speech synthesis (TTS)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Device application                    │
//! │   mic packets ──▶  Protocol  ◀── ProtocolEvent (mpsc) │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │                CloudVoiceAdapter                      │
//! │   buffer ─▶ STT ─▶ {"type":"stt"} ─▶ LLM ─▶           │
//! │   {"type":"llm"} ─▶ TTS ─▶ audio packet               │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │   Baidu OAuth  │  Baidu STT  │  Baidu TTS  │  Gemini  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod baidu;
pub mod config;
pub mod error;
pub mod google;
pub mod http;
pub mod protocol;
pub mod services;

pub use baidu::{BaiduStt, BaiduTts, TokenStore};
pub use config::Config;
pub use error::{Error, Result};
pub use google::GeminiLlm;
pub use http::HttpTransport;
pub use protocol::{
    AdapterSettings, AudioStreamPacket, CloudVoiceAdapter, FlushOutcome, Protocol, ProtocolEvent,
    SendOutcome,
};
pub use services::{CloudServices, LanguageModel, SpeechRecognizer, SpeechSynthesizer};
