//! Speech-to-text via the `OpenAI` transcription API

use crate::{Error, Result};

const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Response from the transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes WAV audio to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
}

impl SpeechToText {
    /// Create a transcriber
    ///
    /// `locale` is reduced to its language subtag (`en-US` → `en`).
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String, locale: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for speech input".to_string(),
            ));
        }

        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or(locale)
            .to_ascii_lowercase();

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            language,
        })
    }

    /// Transcribe WAV bytes
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post(WHISPER_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::debug!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_rejected() {
        assert!(SpeechToText::new(String::new(), "whisper-1".to_string(), "en-US").is_err());
    }

    #[test]
    fn test_locale_reduced_to_language() {
        let stt = SpeechToText::new("k".to_string(), "whisper-1".to_string(), "en-US").unwrap();
        assert_eq!(stt.language, "en");
    }
}
