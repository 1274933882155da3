//! Shared test utilities

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use cloud_voice_adapter::config::ConfigFile;
use cloud_voice_adapter::{
    Config, Error, LanguageModel, Result, SpeechRecognizer, SpeechSynthesizer,
};

/// STT double returning a fixed transcript (or an error when `None`)
pub struct ScriptedStt {
    reply: Option<String>,
    pub calls: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedStt {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_lengths(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedStt {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        self.calls.lock().unwrap().push(audio.to_vec());
        self.reply
            .clone()
            .ok_or_else(|| Error::Stt("scripted failure".to_string()))
    }
}

/// LLM double returning a fixed reply (or an error when `None`)
pub struct ScriptedLlm {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Llm("scripted failure".to_string()))
    }
}

/// TTS double returning fixed audio (or an error when `None`)
pub struct ScriptedTts {
    reply: Option<Vec<u8>>,
    pub texts: Mutex<Vec<String>>,
}

impl ScriptedTts {
    pub fn replying(audio: &[u8]) -> Self {
        Self {
            reply: Some(audio.to_vec()),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedTts {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.texts.lock().unwrap().push(text.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Tts("scripted failure".to_string()))
    }
}

/// Configuration with every endpoint pointed at a mock server
pub fn mock_config(base_url: &str) -> Config {
    let base = base_url.to_string();
    Config::resolve(ConfigFile::default(), move |key| {
        let value = match key {
            "BAIDU_API_KEY" => "test-api-key".to_string(),
            "BAIDU_SECRET_KEY" => "test-secret-key".to_string(),
            "GOOGLE_API_KEY" => "test-google-key".to_string(),
            "BAIDU_TOKEN_URL" => format!("{base}/oauth/2.0/token"),
            "BAIDU_STT_URL" => format!("{base}/server_api"),
            "BAIDU_TTS_URL" => format!("{base}/text2audio"),
            "GOOGLE_LLM_URL" => format!("{base}/v1beta/models/gemini-pro:generateContent"),
            "CLOUD_VOICE_HTTP_TIMEOUT" => "5".to_string(),
            _ => return None,
        };
        Some(value)
    })
}
