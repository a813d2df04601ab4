//! TOML configuration file loading
//!
//! Supports `~/.config/haven/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HavenConfigFile {
    /// Reply/emotion backend
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Voice input/output
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Backend location
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    /// Base URL shared by `/chat` and `/emotion`
    pub base_url: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input
    pub enabled: Option<bool>,

    /// Read bot replies aloud
    pub narration: Option<bool>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `HavenConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> HavenConfigFile {
    config_file_path().map_or_else(HavenConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from `path`
///
/// Missing or unreadable files fall back to defaults.
pub fn load_config_from(path: &Path) -> HavenConfigFile {
    if !path.exists() {
        return HavenConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                HavenConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            HavenConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/haven/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("haven").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[backend]\nbase_url = \"http://10.0.0.2:8000\"\n\n[voice]\nnarration = false\n",
        )
        .unwrap();

        let fc = load_config_from(&path);
        assert_eq!(fc.backend.base_url.as_deref(), Some("http://10.0.0.2:8000"));
        assert_eq!(fc.voice.narration, Some(false));
        assert!(fc.voice.enabled.is_none());
        assert!(fc.api_keys.openai.is_none());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_config_from(&dir.path().join("absent.toml"));
        assert!(fc.backend.base_url.is_none());
    }

    #[test]
    fn test_invalid_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = [[[").unwrap();
        let fc = load_config_from(&path);
        assert!(fc.backend.base_url.is_none());
    }
}
