//! Baidu short speech recognition (JSON upload)

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::TokenStore;
use crate::config::AudioConfig;
use crate::http::HttpTransport;
use crate::services::SpeechRecognizer;
use crate::{Error, Result};

/// JSON body for the recognition endpoint
#[derive(Debug, Serialize)]
pub struct SttRequest<'a> {
    pub format: &'a str,
    pub rate: u32,
    pub channel: u32,
    pub cuid: &'a str,
    pub token: &'a str,
    /// Raw (pre-encoding) audio length in bytes
    pub len: usize,
    /// Base64 of the raw audio
    pub speech: String,
}

/// Recognition response; only `result` matters
#[derive(Debug, Deserialize)]
struct SttResponse {
    #[serde(default)]
    result: Option<Vec<serde_json::Value>>,
}

/// Build the recognition request for a block of audio
#[must_use]
pub fn build_request<'a>(
    audio: &[u8],
    token: &'a str,
    cuid: &'a str,
    config: &'a AudioConfig,
) -> SttRequest<'a> {
    SttRequest {
        format: &config.format,
        rate: config.rate,
        channel: config.channels,
        cuid,
        token,
        len: audio.len(),
        speech: STANDARD.encode(audio),
    }
}

/// First string of the `result` array, or empty when absent or mismatched
#[must_use]
pub fn parse_response(body: &str) -> String {
    serde_json::from_str::<SttResponse>(body)
        .ok()
        .and_then(|r| r.result)
        .and_then(|results| results.into_iter().next())
        .and_then(|first| match first {
            serde_json::Value::String(text) => Some(text),
            _ => None,
        })
        .unwrap_or_default()
}

/// Baidu speech-to-text client
pub struct BaiduStt {
    http: HttpTransport,
    tokens: Arc<TokenStore>,
    url: String,
    cuid: String,
    audio: AudioConfig,
}

impl BaiduStt {
    /// Create a client sharing the given token store
    #[must_use]
    pub fn new(
        http: HttpTransport,
        tokens: Arc<TokenStore>,
        url: String,
        cuid: String,
        audio: AudioConfig,
    ) -> Self {
        Self {
            http,
            tokens,
            url,
            cuid,
            audio,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for BaiduStt {
    fn name(&self) -> &'static str {
        "baidu"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let token = self.tokens.ensure().await?;
        tracing::debug!(audio_bytes = audio.len(), "starting Baidu transcription");

        let url = format!(
            "{}?dev_pid={}&token={}",
            self.url,
            self.audio.dev_pid,
            urlencoding::encode(&token)
        );
        let request = build_request(audio, &token, &self.cuid, &self.audio);
        let body = serde_json::to_string(&request)?;

        let response = self
            .http
            .post(&url, body, "application/json")
            .await
            .map_err(|e| Error::Stt(e.to_string()))?;

        let transcript = parse_response(&response);
        if transcript.is_empty() {
            tracing::debug!(response = %response, "Baidu returned no transcript");
        } else {
            tracing::info!(transcript = %transcript, "transcription complete");
        }
        Ok(transcript)
    }
}
