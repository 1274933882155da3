//! TOML configuration file loading
//!
//! Supports `~/.config/cloud-voice/config.toml` as a persistent config source.
//! All fields are optional: the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::Error;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Service credentials
    #[serde(default)]
    pub credentials: CredentialsFileConfig,

    /// Endpoint overrides
    #[serde(default)]
    pub endpoints: EndpointsFileConfig,

    /// Audio buffering and STT parameters
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// TTS voice parameters
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpFileConfig,

    /// Device identity
    #[serde(default)]
    pub device: DeviceFileConfig,
}

/// Credentials section
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsFileConfig {
    pub baidu_api_key: Option<String>,
    pub baidu_secret_key: Option<String>,
    pub google_api_key: Option<String>,
}

/// Endpoint overrides (useful for proxies and tests)
#[derive(Debug, Default, Deserialize)]
pub struct EndpointsFileConfig {
    pub token_url: Option<String>,
    pub stt_url: Option<String>,
    pub tts_url: Option<String>,
    pub llm_url: Option<String>,
}

/// Audio section
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Buffered byte count that triggers a flush
    pub flush_threshold: Option<usize>,

    /// Format reported to STT (e.g. "opus")
    pub format: Option<String>,

    pub rate: Option<u32>,
    pub channels: Option<u32>,
    pub dev_pid: Option<u32>,
    pub output_sample_rate: Option<u32>,
    pub output_frame_duration: Option<u32>,
}

/// TTS voice section
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    pub lan: Option<String>,
    pub spd: Option<u8>,
    pub pit: Option<u8>,
    pub vol: Option<u8>,
    pub per: Option<u32>,
    pub aue: Option<u8>,
}

/// HTTP section
#[derive(Debug, Default, Deserialize)]
pub struct HttpFileConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Device section
#[derive(Debug, Default, Deserialize)]
pub struct DeviceFileConfig {
    /// Client id reported to Baidu
    pub cuid: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path().filter(|p| p.exists()) else {
        return ConfigFile::default();
    };

    let parsed = std::fs::read_to_string(&path)
        .map_err(Error::from)
        .and_then(|content| toml::from_str::<ConfigFile>(&content).map_err(Error::from));

    match parsed {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "ignoring config file, using defaults"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/cloud-voice/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("cloud-voice")
            .join("config.toml")
    })
}
