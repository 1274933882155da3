//! Baidu speech synthesis
//!
//! The endpoint answers with raw audio on success and a JSON error object
//! otherwise; the two are told apart by `Content-Type`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::TokenStore;
use crate::config::TtsVoiceConfig;
use crate::http::{HttpTransport, RawResponse};
use crate::services::SpeechSynthesizer;
use crate::{Error, Result};

/// Error body returned instead of audio
#[derive(Debug, Deserialize)]
struct TtsErrorResponse {
    err_no: Option<i64>,
    err_msg: Option<String>,
}

/// Form fields for a synthesis request
#[must_use]
pub fn build_form(
    text: &str,
    token: &str,
    cuid: &str,
    voice: &TtsVoiceConfig,
) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("tex", text.to_string()),
        ("tok", token.to_string()),
        ("cuid", cuid.to_string()),
        ("ctp", "1".to_string()),
        ("lan", voice.lan.clone()),
        ("spd", voice.spd.to_string()),
        ("pit", voice.pit.to_string()),
        ("vol", voice.vol.to_string()),
        ("per", voice.per.to_string()),
    ];
    if let Some(aue) = voice.aue {
        form.push(("aue", aue.to_string()));
    }
    form
}

/// Audio bytes from a synthesis response, or the reported error
///
/// # Errors
///
/// Returns `Error::Tts` when the response is not labelled as audio
pub fn parse_response(response: RawResponse) -> Result<Vec<u8>> {
    if response.is_audio() {
        return Ok(response.body);
    }

    let content_type = response.content_type.clone().unwrap_or_default();
    let text = response.into_text();
    match serde_json::from_str::<TtsErrorResponse>(&text) {
        Ok(TtsErrorResponse {
            err_no: Some(code),
            err_msg,
        }) => Err(Error::Tts(format!(
            "Baidu TTS error {code}: {}",
            err_msg.unwrap_or_default()
        ))),
        _ => Err(Error::Tts(format!(
            "unexpected TTS response content type '{content_type}'"
        ))),
    }
}

/// Baidu text-to-speech client
pub struct BaiduTts {
    http: HttpTransport,
    tokens: Arc<TokenStore>,
    url: String,
    cuid: String,
    voice: TtsVoiceConfig,
}

impl BaiduTts {
    /// Create a client sharing the given token store
    #[must_use]
    pub fn new(
        http: HttpTransport,
        tokens: Arc<TokenStore>,
        url: String,
        cuid: String,
        voice: TtsVoiceConfig,
    ) -> Self {
        Self {
            http,
            tokens,
            url,
            cuid,
            voice,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for BaiduTts {
    fn name(&self) -> &'static str {
        "baidu"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let token = self.tokens.ensure().await?;
        tracing::debug!(chars = text.chars().count(), "starting Baidu synthesis");

        let form = build_form(text, &token, &self.cuid, &self.voice);
        let params: Vec<(&str, &str)> = form.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response = self
            .http
            .post_form(&self.url, &params)
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;

        let audio = parse_response(response).map_err(|e| {
            tracing::error!(error = %e, "Baidu TTS rejected request");
            e
        })?;

        tracing::info!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio)
    }
}
