//! Wiring of one chat session
//!
//! Builds the gateway, orchestrator, speech machine and narration from
//! configuration, and owns the channel capture devices report on.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::gateway::{HttpGateway, RemoteGateway};
use crate::orchestrator::SendOrchestrator;
use crate::speech::{CaptureEvent, NarrationSync, SpeechCapture, SpeechInput, SpeechSynthesis};
use crate::Result;

/// Capability handles the environment could provide
type Capabilities = (
    Option<Box<dyn SpeechCapture>>,
    Option<Arc<dyn SpeechSynthesis>>,
);

/// Everything a front end needs to run one conversation
pub struct ChatSession {
    orchestrator: SendOrchestrator,
    speech: SpeechInput,
    narration: NarrationSync,
    narration_task: JoinHandle<()>,
    capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    /// Keeps `capture_rx` open when no device holds a sender
    capture_tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("orchestrator", &self.orchestrator)
            .field("speech", &self.speech)
            .field("narration", &self.narration)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Build a session against the configured backend
    ///
    /// Speech capabilities are attached when the build and configuration
    /// allow it; otherwise voice input reports itself unsupported and
    /// narration is skipped. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the backend URL is invalid
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = Arc::new(HttpGateway::new(&config.backend.base_url)?);
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let (capture, synth) = build_capabilities(config, &capture_tx);

        tracing::info!(
            backend = %gateway.base_url(),
            voice_input = capture.is_some(),
            narration = synth.is_some(),
            "chat session ready"
        );

        Ok(Self::assemble(gateway, capture, synth, capture_tx, capture_rx))
    }

    /// Build a session from explicit parts
    ///
    /// `capture_tx` is the sender the capture device reports on. Must be
    /// called from within a tokio runtime.
    #[must_use]
    pub fn with_parts(
        gateway: Arc<dyn RemoteGateway>,
        capture: Option<Box<dyn SpeechCapture>>,
        synth: Option<Arc<dyn SpeechSynthesis>>,
        capture_tx: mpsc::UnboundedSender<CaptureEvent>,
        capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    ) -> Self {
        Self::assemble(gateway, capture, synth, capture_tx, capture_rx)
    }

    fn assemble(
        gateway: Arc<dyn RemoteGateway>,
        capture: Option<Box<dyn SpeechCapture>>,
        synth: Option<Arc<dyn SpeechSynthesis>>,
        capture_tx: mpsc::UnboundedSender<CaptureEvent>,
        capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    ) -> Self {
        let orchestrator = SendOrchestrator::new(gateway);
        let speech = SpeechInput::new(capture, Arc::new(orchestrator.clone()));
        let narration = NarrationSync::new(synth);
        let narration_task = narration.clone().spawn(orchestrator.store());

        Self {
            orchestrator,
            speech,
            narration,
            narration_task,
            capture_rx,
            capture_tx,
        }
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &SendOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub const fn speech(&self) -> &SpeechInput {
        &self.speech
    }

    pub const fn speech_mut(&mut self) -> &mut SpeechInput {
        &mut self.speech
    }

    #[must_use]
    pub const fn narration(&self) -> &NarrationSync {
        &self.narration
    }

    /// Sender capture devices report on
    #[must_use]
    pub fn capture_sender(&self) -> mpsc::UnboundedSender<CaptureEvent> {
        self.capture_tx.clone()
    }

    /// Wait for the next capture device event
    pub async fn next_capture_event(&mut self) -> Option<CaptureEvent> {
        self.capture_rx.recv().await
    }

    /// Feed a capture device event into the speech machine
    pub fn handle_capture_event(&mut self, event: CaptureEvent) {
        self.speech.dispatch(event);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.narration_task.abort();
    }
}

#[cfg(feature = "audio")]
fn build_capabilities(
    config: &Config,
    capture_tx: &mpsc::UnboundedSender<CaptureEvent>,
) -> Capabilities {
    use crate::speech::CAPTURE_LOCALE;
    use crate::voice::{MicrophoneCapture, SpeechToText, SpokenNarration, TextToSpeech};

    let Some(api_key) = config.api_keys.openai.clone() else {
        tracing::info!("no OpenAI API key, speech capabilities disabled");
        return (None, None);
    };
    let voice = &config.voice;

    let capture = if voice.enabled {
        SpeechToText::new(api_key.clone(), voice.stt_model.clone(), CAPTURE_LOCALE)
            .and_then(|stt| MicrophoneCapture::new(stt, capture_tx.clone()))
            .map(|mic| Box::new(mic) as Box<dyn SpeechCapture>)
            .inspect_err(|e| tracing::warn!(error = %e, "speech input unavailable"))
            .ok()
    } else {
        None
    };

    let synth = if voice.narration {
        TextToSpeech::new(
            api_key,
            voice.tts_model.clone(),
            voice.tts_voice.clone(),
            voice.tts_speed,
        )
        .and_then(SpokenNarration::new)
        .map(|n| Arc::new(n) as Arc<dyn SpeechSynthesis>)
        .inspect_err(|e| tracing::warn!(error = %e, "narration unavailable"))
        .ok()
    } else {
        None
    };

    (capture, synth)
}

#[cfg(not(feature = "audio"))]
fn build_capabilities(
    config: &Config,
    _capture_tx: &mpsc::UnboundedSender<CaptureEvent>,
) -> Capabilities {
    if config.voice.enabled || config.voice.narration {
        tracing::debug!("built without audio support, speech capabilities disabled");
    }
    (None, None)
}
