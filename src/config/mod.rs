//! Configuration management for the cloud voice adapter
//!
//! Values resolve in priority order: environment variable, TOML file, default.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};

pub use file::ConfigFile;

/// Default Baidu OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Default Baidu speech recognition endpoint
pub const DEFAULT_STT_URL: &str = "https://vop.baidu.com/server_api";

/// Default Baidu speech synthesis endpoint
pub const DEFAULT_TTS_URL: &str = "https://tsn.baidu.com/text2audio";

/// Default Gemini generation endpoint
pub const DEFAULT_LLM_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// Default device client id sent to Baidu
pub const DEFAULT_CUID: &str = "xiaozhi_device";

/// Default buffered byte count beyond which audio is flushed to STT
pub const DEFAULT_FLUSH_THRESHOLD: usize = 16_000;

/// Adapter configuration
#[derive(Debug)]
pub struct Config {
    /// Service credentials
    pub credentials: Credentials,

    /// Remote endpoints
    pub endpoints: Endpoints,

    /// Audio buffering and STT request parameters
    pub audio: AudioConfig,

    /// TTS voice parameters
    pub tts: TtsVoiceConfig,

    /// HTTP transport settings
    pub http: HttpConfig,

    /// Client id reported to Baidu (`cuid`)
    pub cuid: String,
}

/// Credentials for the three cloud services
///
/// Secrets are redacted from `Debug` output.
#[derive(Debug, Default)]
pub struct Credentials {
    /// Baidu API key (OAuth `client_id`)
    pub baidu_api_key: Option<SecretString>,

    /// Baidu secret key (OAuth `client_secret`)
    pub baidu_secret_key: Option<SecretString>,

    /// Google generative-language API key
    pub google_api_key: Option<SecretString>,
}

impl Credentials {
    /// Names of credentials that are absent or empty
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        use secrecy::ExposeSecret;

        let present = |s: &Option<SecretString>| {
            s.as_ref().is_some_and(|s| !s.expose_secret().is_empty())
        };

        let mut missing = Vec::new();
        if !present(&self.baidu_api_key) {
            missing.push("baidu_api_key");
        }
        if !present(&self.baidu_secret_key) {
            missing.push("baidu_secret_key");
        }
        if !present(&self.google_api_key) {
            missing.push("google_api_key");
        }
        missing
    }
}

/// Remote service endpoints
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Baidu OAuth token endpoint
    pub token_url: String,

    /// Baidu STT endpoint
    pub stt_url: String,

    /// Baidu TTS endpoint
    pub tts_url: String,

    /// Gemini `generateContent` endpoint
    pub llm_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            stt_url: DEFAULT_STT_URL.to_string(),
            tts_url: DEFAULT_TTS_URL.to_string(),
            llm_url: DEFAULT_LLM_URL.to_string(),
        }
    }
}

/// Audio buffering and STT request parameters
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Flush once the buffer grows beyond this many bytes
    pub flush_threshold: usize,

    /// Audio format reported to STT (e.g. "opus", "pcm")
    pub format: String,

    /// Sample rate reported to STT
    pub rate: u32,

    /// Channel count reported to STT
    pub channels: u32,

    /// Baidu language model id (`dev_pid`), 1537 is Mandarin
    pub dev_pid: u32,

    /// Sample rate stamped on synthesized packets
    pub output_sample_rate: u32,

    /// Frame duration (ms) stamped on synthesized packets
    pub output_frame_duration: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            format: "opus".to_string(),
            rate: 16_000,
            channels: 1,
            dev_pid: 1537,
            output_sample_rate: 16_000,
            output_frame_duration: 60,
        }
    }
}

/// Baidu TTS voice parameters
#[derive(Debug, Clone)]
pub struct TtsVoiceConfig {
    /// Language (`lan`)
    pub lan: String,

    /// Speed 0-15 (`spd`)
    pub spd: u8,

    /// Pitch 0-15 (`pit`)
    pub pit: u8,

    /// Volume 0-15 (`vol`)
    pub vol: u8,

    /// Voice id (`per`)
    pub per: u32,

    /// Audio encoding (`aue`); omitted from the request when unset
    pub aue: Option<u8>,
}

impl Default for TtsVoiceConfig {
    fn default() -> Self {
        Self {
            lan: "zh".to_string(),
            spd: 5,
            pit: 5,
            vol: 5,
            per: 0,
            aue: None,
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the default config file
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible to match [`Config::load_from`]
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Ok(Self::resolve(fc, |key| std::env::var(key).ok()))
    }

    /// Load configuration from an explicit TOML file, with env overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fc: ConfigFile = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(Self::resolve(fc, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed config file with an environment lookup (env > toml > default)
    pub fn resolve<F>(fc: ConfigFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |value: Option<String>| value.filter(|v| !v.is_empty()).map(SecretString::from);

        let credentials = Credentials {
            baidu_api_key: secret(env("BAIDU_API_KEY").or(fc.credentials.baidu_api_key)),
            baidu_secret_key: secret(
                env("BAIDU_SECRET_KEY").or(fc.credentials.baidu_secret_key),
            ),
            google_api_key: secret(env("GOOGLE_API_KEY").or(fc.credentials.google_api_key)),
        };

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            token_url: env("BAIDU_TOKEN_URL")
                .or(fc.endpoints.token_url)
                .unwrap_or(defaults.token_url),
            stt_url: env("BAIDU_STT_URL")
                .or(fc.endpoints.stt_url)
                .unwrap_or(defaults.stt_url),
            tts_url: env("BAIDU_TTS_URL")
                .or(fc.endpoints.tts_url)
                .unwrap_or(defaults.tts_url),
            llm_url: env("GOOGLE_LLM_URL")
                .or(fc.endpoints.llm_url)
                .unwrap_or(defaults.llm_url),
        };

        let defaults = AudioConfig::default();
        let audio = AudioConfig {
            flush_threshold: env("CLOUD_VOICE_FLUSH_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .or(fc.audio.flush_threshold)
                .unwrap_or(defaults.flush_threshold),
            format: fc.audio.format.unwrap_or(defaults.format),
            rate: fc.audio.rate.unwrap_or(defaults.rate),
            channels: fc.audio.channels.unwrap_or(defaults.channels),
            dev_pid: fc.audio.dev_pid.unwrap_or(defaults.dev_pid),
            output_sample_rate: fc
                .audio
                .output_sample_rate
                .unwrap_or(defaults.output_sample_rate),
            output_frame_duration: fc
                .audio
                .output_frame_duration
                .unwrap_or(defaults.output_frame_duration),
        };

        let defaults = TtsVoiceConfig::default();
        let tts = TtsVoiceConfig {
            lan: fc.tts.lan.unwrap_or(defaults.lan),
            spd: fc.tts.spd.unwrap_or(defaults.spd),
            pit: fc.tts.pit.unwrap_or(defaults.pit),
            vol: fc.tts.vol.unwrap_or(defaults.vol),
            per: fc.tts.per.unwrap_or(defaults.per),
            aue: fc.tts.aue,
        };

        let http = HttpConfig {
            timeout: env("CLOUD_VOICE_HTTP_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .or(fc.http.timeout_secs)
                .map_or_else(|| HttpConfig::default().timeout, Duration::from_secs),
        };

        let cuid = env("CLOUD_VOICE_CUID")
            .or(fc.device.cuid)
            .unwrap_or_else(|| DEFAULT_CUID.to_string());

        Self {
            credentials,
            endpoints,
            audio,
            tts,
            http,
            cuid,
        }
    }

    /// Check that every credential needed by the pipeline is configured
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the missing credentials
    pub fn validate(&self) -> Result<()> {
        let missing = self.credentials.missing();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::Config(format!(
            "API keys not configured: {}",
            missing.join(", ")
        )))
    }
}
