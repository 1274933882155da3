//! Cloud service seams used by the flush pipeline
//!
//! The adapter only talks to these traits, so tests can swap in mocks and
//! deployments can swap providers.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::baidu::{BaiduStt, BaiduTts, TokenStore};
use crate::config::Config;
use crate::google::GeminiLlm;
use crate::http::HttpTransport;
use crate::Result;

/// Converts buffered audio to text
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Transcribe raw audio bytes
    ///
    /// An empty string means nothing was recognized.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Produces a reply to a transcript
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Generate a reply; an empty string means no usable answer
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Turns reply text into audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Synthesize text into encoded audio bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// The production service set: Baidu STT/TTS sharing one token, plus Gemini
pub struct CloudServices {
    /// Baidu access token shared by STT and TTS
    pub tokens: Arc<TokenStore>,

    /// Baidu speech recognition
    pub stt: Arc<BaiduStt>,

    /// Gemini text generation
    pub llm: Arc<GeminiLlm>,

    /// Baidu speech synthesis
    pub tts: Arc<BaiduTts>,
}

impl CloudServices {
    /// Build the clients described by `config`
    ///
    /// No request is made; missing credentials become empty secrets and
    /// surface as failures on first use.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpTransport::new(&config.http)?;
        let creds = &config.credentials;
        let secret = |s: &Option<SecretString>| {
            SecretString::from(
                s.as_ref()
                    .map(|s| s.expose_secret().to_string())
                    .unwrap_or_default(),
            )
        };

        let tokens = Arc::new(TokenStore::new(
            http.clone(),
            config.endpoints.token_url.clone(),
            secret(&creds.baidu_api_key),
            secret(&creds.baidu_secret_key),
        ));
        let stt = Arc::new(BaiduStt::new(
            http.clone(),
            Arc::clone(&tokens),
            config.endpoints.stt_url.clone(),
            config.cuid.clone(),
            config.audio.clone(),
        ));
        let tts = Arc::new(BaiduTts::new(
            http.clone(),
            Arc::clone(&tokens),
            config.endpoints.tts_url.clone(),
            config.cuid.clone(),
            config.tts.clone(),
        ));
        let llm = Arc::new(GeminiLlm::new(
            http,
            config.endpoints.llm_url.clone(),
            secret(&creds.google_api_key),
        ));

        Ok(Self {
            tokens,
            stt,
            llm,
            tts,
        })
    }
}
