//! Voice input and output around the conversation
//!
//! The capture device and the synthesis engine are capabilities handed in by
//! the caller. When the environment has neither, both halves degrade quietly:
//! input reports itself unsupported and narration is skipped.

mod input;
mod output;

use tokio::sync::mpsc;

pub use input::{
    CaptureErrorKind, CaptureEvent, SpeechCapture, SpeechInput, SpeechSession, SpeechState,
    CAPTURE_LOCALE, GENERIC_ERROR_MESSAGE, MIC_BLOCKED_MESSAGE, NETWORK_MESSAGE,
    NO_SPEECH_MESSAGE, UNSUPPORTED_MESSAGE,
};
pub use output::{NarrationSync, SpeechSynthesis, narration_text};

/// Receives finished transcripts from the speech input machine
pub trait TranscriptSink: Send + Sync {
    /// Hand over one recognized utterance
    fn submit(&self, text: &str);
}

impl TranscriptSink for mpsc::UnboundedSender<String> {
    fn submit(&self, text: &str) {
        if self.send(text.to_string()).is_err() {
            tracing::debug!("transcript receiver dropped");
        }
    }
}
