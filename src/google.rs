//! Google Gemini `generateContent` client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::http::HttpTransport;
use crate::services::LanguageModel;
use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

/// Request body for a single-turn prompt
///
/// # Errors
///
/// Returns error if serialization fails
pub fn build_request(prompt: &str) -> Result<String> {
    let request = GeminiRequest {
        contents: vec![GeminiContent {
            parts: vec![GeminiPart { text: prompt }],
        }],
    };
    Ok(serde_json::to_string(&request)?)
}

/// `candidates[0].content.parts[0].text`, or empty when any step is missing
#[must_use]
pub fn parse_response(body: &str) -> String {
    let Ok(root) = serde_json::from_str::<serde_json::Value>(body) else {
        return String::new();
    };

    root.get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .and_then(|p| p.first())
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Error envelope returned by the generative-language API
#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
}

/// `error.message` from a Gemini error envelope
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<GeminiErrorResponse>(body)
        .ok()
        .map(|r| r.error.message)
        .filter(|m| !m.is_empty())
}

fn llm_error(e: &Error) -> Error {
    let Error::HttpStatus { status, body, .. } = e else {
        return Error::Llm(e.to_string());
    };
    match error_message(body) {
        Some(message) => {
            tracing::warn!(status = *status, message = %message, "Gemini returned an error");
            Error::Llm(format!("HTTP {status}: {message}"))
        }
        None => Error::Llm(e.to_string()),
    }
}

/// Gemini language model client
pub struct GeminiLlm {
    http: HttpTransport,
    url: String,
    api_key: SecretString,
}

impl GeminiLlm {
    /// Create a client for the given endpoint
    #[must_use]
    pub fn new(http: HttpTransport, url: String, api_key: SecretString) -> Self {
        Self { http, url, api_key }
    }
}

#[async_trait]
impl LanguageModel for GeminiLlm {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(chars = prompt.chars().count(), "querying Gemini");

        let url = format!(
            "{}?key={}",
            self.url,
            urlencoding::encode(self.api_key.expose_secret())
        );
        let body = build_request(prompt)?;

        let response = self
            .http
            .post(&url, body, "application/json")
            .await
            .map_err(|e| llm_error(&e))?;

        let reply = parse_response(&response);
        if reply.is_empty() {
            tracing::debug!("Gemini response has no candidate text");
        } else {
            tracing::info!(reply = %reply, "LLM reply received");
        }
        Ok(reply)
    }
}
