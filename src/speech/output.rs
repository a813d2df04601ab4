//! Narration of bot replies

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::conversation::{ConversationEvent, ConversationStore, Message, strip_emotion};

/// A text-to-speech engine
///
/// `speak` must return promptly; playback happens in the background.
pub trait SpeechSynthesis: Send + Sync {
    /// Start narrating `text`
    fn speak(&self, text: &str);

    /// Stop everything currently playing or queued
    fn cancel_all(&self);
}

/// Text to narrate for a bot message: the reply without its emotion annotation
#[must_use]
pub fn narration_text(text: &str) -> &str {
    strip_emotion(text).trim()
}

/// Speaks each new bot message, interrupting whatever was playing
#[derive(Clone, Default)]
pub struct NarrationSync {
    synth: Option<Arc<dyn SpeechSynthesis>>,
}

impl std::fmt::Debug for NarrationSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationSync")
            .field("enabled", &self.synth.is_some())
            .finish()
    }
}

impl NarrationSync {
    /// Create the synchronizer; `None` disables narration
    #[must_use]
    pub fn new(synth: Option<Arc<dyn SpeechSynthesis>>) -> Self {
        Self { synth }
    }

    /// Whether a synthesis engine is available
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.synth.is_some()
    }

    /// React to one appended message
    ///
    /// Returns the narrated text, or `None` when nothing was spoken.
    pub fn on_message(&self, message: &Message) -> Option<String> {
        if !message.is_bot() {
            return None;
        }
        let synth = self.synth.as_ref()?;

        // A newer reply silences the old one even when it has nothing to say
        synth.cancel_all();

        let text = narration_text(&message.text);
        if text.is_empty() {
            return None;
        }

        synth.speak(text);
        tracing::debug!(chars = text.len(), "narrating reply");
        Some(text.to_string())
    }

    /// Consume conversation events until the store goes away
    pub async fn run(self, mut events: broadcast::Receiver<ConversationEvent>) {
        loop {
            match events.recv().await {
                Ok(ConversationEvent::MessageAppended(message)) => {
                    self.on_message(&message);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "narration fell behind conversation events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Follow `store` on a background task
    #[must_use]
    pub fn spawn(self, store: &ConversationStore) -> JoinHandle<()> {
        let events = store.subscribe();
        tokio::spawn(self.run(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_text() {
        assert_eq!(narration_text("I'm here for you (Emotion: calm)"), "I'm here for you");
        assert_eq!(
            narration_text("Sorry, something went wrong. Please try again."),
            "Sorry, something went wrong. Please try again."
        );
    }

    #[test]
    fn test_disabled_sync_skips_silently() {
        let sync = NarrationSync::new(None);
        let message = Message {
            text: "hello (Emotion: neutral)".to_string(),
            sender: crate::conversation::Sender::Bot,
            timestamp: 0,
            emotion: Some("neutral".to_string()),
        };
        assert!(!sync.is_enabled());
        assert_eq!(sync.on_message(&message), None);
    }
}
