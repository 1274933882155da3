//! Error types for the cloud voice adapter

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the cloud voice adapter
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Access token exchange error
    #[error("token error: {0}")]
    Token(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Malformed or unsupported device message
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Remote answered with something other than 200 OK
    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus {
        /// Status code returned
        status: u16,
        /// Request URL with the query string stripped
        url: String,
        /// Response body, empty when unreadable
        body: String,
    },

    /// Remote answered 200 OK with no body
    #[error("empty response body from {0}")]
    EmptyResponse(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
