//! Spoken narration through TTS and the default speaker

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;

use super::playback::AudioPlayback;
use super::tts::TextToSpeech;
use crate::speech::SpeechSynthesis;
use crate::{Error, Result};

/// Speech synthesis that plays one narration at a time
pub struct SpokenNarration {
    tts: Arc<TextToSpeech>,
    runtime: Handle,
    /// Cancel flag of the narration currently playing
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl SpokenNarration {
    /// Create the narrator
    ///
    /// # Errors
    ///
    /// Returns error if called outside a tokio runtime
    pub fn new(tts: TextToSpeech) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Unsupported(format!("narration needs a runtime: {e}")))?;

        Ok(Self {
            tts: Arc::new(tts),
            runtime,
            current: Mutex::new(None),
        })
    }
}

impl SpeechSynthesis for SpokenNarration {
    fn speak(&self, text: &str) {
        let cancel = Arc::new(AtomicBool::new(false));
        if let Some(previous) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&cancel))
        {
            previous.store(true, Ordering::Relaxed);
        }

        let tts = Arc::clone(&self.tts);
        let text = text.to_string();

        self.runtime.spawn(async move {
            let audio = match tts.synthesize(&text).await {
                Ok(audio) => audio,
                Err(e) => {
                    tracing::warn!(error = %e, "narration synthesis failed");
                    return;
                }
            };
            if cancel.load(Ordering::Relaxed) {
                return;
            }

            let played = tokio::task::spawn_blocking(move || {
                AudioPlayback::new()?.play_mp3(&audio, &cancel)
            })
            .await;

            match played {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "narration playback failed"),
                Err(e) => tracing::warn!(error = %e, "narration task failed"),
            }
        });
    }

    fn cancel_all(&self) {
        if let Some(current) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            current.store(true, Ordering::Relaxed);
        }
    }
}
