//! Configuration management for Haven
//!
//! Values resolve env > TOML file > default. The binary applies CLI flags on
//! top of the loaded result.

pub mod file;

use url::Url;

use crate::{Error, Result};

/// Backend location used when nothing else is configured
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

/// Haven configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Reply/emotion backend
    pub backend: BackendConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL for `/chat` and `/emotion` (from `HAVEN_API_BASE`)
    pub base_url: String,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input
    pub enabled: bool,

    /// Read bot replies aloud
    pub narration: bool,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            narration: true,
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper and TTS)
    pub openai: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &self.openai.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: DEFAULT_API_BASE.to_string(),
            },
            voice: VoiceConfig::default(),
            api_keys: ApiKeys::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// Call [`Config::validate`] once any overrides are applied.
    #[must_use]
    pub fn load() -> Self {
        Self::from_file_config(file::load_config_file())
    }

    /// Layer environment variables over a parsed config file
    #[must_use]
    pub fn from_file_config(fc: file::HavenConfigFile) -> Self {
        let defaults = VoiceConfig::default();

        let backend = BackendConfig {
            base_url: env_string("HAVEN_API_BASE")
                .or(fc.backend.base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        };

        let voice = VoiceConfig {
            enabled: env_flag("HAVEN_VOICE_ENABLED")
                .or(fc.voice.enabled)
                .unwrap_or(defaults.enabled),
            narration: env_flag("HAVEN_NARRATION")
                .or(fc.voice.narration)
                .unwrap_or(defaults.narration),
            stt_model: env_string("HAVEN_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.stt_model),
            tts_model: env_string("HAVEN_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.tts_model),
            tts_voice: fc.voice.tts_voice.unwrap_or(defaults.tts_voice),
            tts_speed: fc.voice.tts_speed.unwrap_or(defaults.tts_speed),
        };

        let api_keys = ApiKeys {
            openai: env_string("OPENAI_API_KEY").or(fc.api_keys.openai),
        };

        Self {
            backend,
            voice,
            api_keys,
        }
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns error if the backend URL is malformed or not http(s), or the
    /// TTS speed is out of range
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.backend.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "backend url must be http or https, got {}",
                url.scheme()
            )));
        }

        if !(0.25..=4.0).contains(&self.voice.tts_speed) {
            return Err(Error::Config(format!(
                "tts speed must be between 0.25 and 4.0, got {}",
                self.voice.tts_speed
            )));
        }

        Ok(())
    }
}

/// Non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Boolean environment variable (`1`/`true`/`yes`, `0`/`false`/`no`)
fn env_flag(key: &str) -> Option<bool> {
    env_string(key).and_then(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
