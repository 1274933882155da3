//! Baidu cloud speech services
//!
//! STT and TTS share one access token obtained through [`TokenStore`].

pub mod stt;
pub mod token;
pub mod tts;

pub use stt::BaiduStt;
pub use token::{TokenStore, parse_token_response};
pub use tts::BaiduTts;
