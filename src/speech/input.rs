//! Speech input state machine
//!
//! One capture session cycles `Idle → Listening → (GotResult | Errored) → Idle`.
//! Capture devices report start, result, error and end as separate events,
//! and `End` may follow a result or an error; the machine only submits from
//! `Listening`, so a late `End` never re-triggers anything.

use std::sync::Arc;

use super::TranscriptSink;
use crate::Result;

/// Locale capture devices are asked to recognize
pub const CAPTURE_LOCALE: &str = "en-US";

/// Shown when nothing was heard
pub const NO_SPEECH_MESSAGE: &str = "No speech detected, try again.";

/// Shown when the recognizer could not reach its service
pub const NETWORK_MESSAGE: &str = "Network issue, check your connection.";

/// Shown when the microphone is not available to us
pub const MIC_BLOCKED_MESSAGE: &str = "Microphone blocked, allow mic access.";

/// Shown for any other capture failure
pub const GENERIC_ERROR_MESSAGE: &str = "Speech error occurred. Please try again.";

/// Shown when the environment has no capture capability at all
pub const UNSUPPORTED_MESSAGE: &str = "Speech recognition not supported in this environment.";

/// Phase of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechState {
    /// Not capturing
    #[default]
    Idle,
    /// Capture running, waiting for a result
    Listening,
    /// A transcript arrived and was submitted
    GotResult,
    /// Capture failed
    Errored,
}

/// Failure reported by a capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureErrorKind {
    NoSpeech,
    Network,
    NotAllowed,
    Other(String),
}

impl CaptureErrorKind {
    /// Map a device error code (`no-speech`, `network`, `not-allowed`, ...)
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            "not-allowed" => Self::NotAllowed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Short message for the user
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NoSpeech => NO_SPEECH_MESSAGE,
            Self::Network => NETWORK_MESSAGE,
            Self::NotAllowed => MIC_BLOCKED_MESSAGE,
            Self::Other(_) => GENERIC_ERROR_MESSAGE,
        }
    }
}

/// Lifecycle events emitted by a capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Start,
    Result(String),
    Error(CaptureErrorKind),
    End,
}

/// A device that turns speech into text
///
/// Implementations report progress as [`CaptureEvent`]s through whatever
/// channel they were built with; the owner feeds those back into
/// [`SpeechInput::dispatch`].
pub trait SpeechCapture: Send {
    /// Begin a single, non-continuous capture
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot start
    fn start(&mut self) -> Result<()>;

    /// Stop capturing; the device still reports `End` afterwards
    fn stop(&mut self);
}

/// What the user sees of the capture session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechSession {
    pub state: SpeechState,
    /// Last recognized utterance
    pub transcript: String,
    /// Last user-facing error
    pub last_error: Option<String>,
}

/// Voice capture state machine
pub struct SpeechInput {
    capture: Option<Box<dyn SpeechCapture>>,
    sink: Arc<dyn TranscriptSink>,
    session: SpeechSession,
    stop_requested: bool,
}

impl std::fmt::Debug for SpeechInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechInput")
            .field("supported", &self.capture.is_some())
            .field("session", &self.session)
            .field("stop_requested", &self.stop_requested)
            .finish_non_exhaustive()
    }
}

impl SpeechInput {
    /// Create the machine
    ///
    /// Passing no capture device leaves the machine permanently unsupported;
    /// the unsupported message is reported right away.
    #[must_use]
    pub fn new(capture: Option<Box<dyn SpeechCapture>>, sink: Arc<dyn TranscriptSink>) -> Self {
        let session = if capture.is_some() {
            SpeechSession::default()
        } else {
            tracing::info!("speech capture unavailable");
            SpeechSession {
                last_error: Some(UNSUPPORTED_MESSAGE.to_string()),
                ..SpeechSession::default()
            }
        };

        Self {
            capture,
            sink,
            session,
            stop_requested: false,
        }
    }

    /// Whether a capture device is present
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.capture.is_some()
    }

    /// Whether capture is running (drives the toggle's label)
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.session.state == SpeechState::Listening
    }

    /// Current phase
    #[must_use]
    pub const fn state(&self) -> SpeechState {
        self.session.state
    }

    /// Last recognized utterance
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.session.transcript
    }

    /// Last user-facing error
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.session.last_error.as_deref()
    }

    /// Snapshot of the session for display
    #[must_use]
    pub fn session(&self) -> &SpeechSession {
        &self.session
    }

    /// Begin listening
    ///
    /// No-op while already listening or when unsupported.
    pub fn start(&mut self) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };
        if self.session.state == SpeechState::Listening {
            return;
        }

        self.session.transcript.clear();
        self.session.last_error = None;
        self.stop_requested = false;

        match capture.start() {
            Ok(()) => {
                self.session.state = SpeechState::Listening;
                tracing::debug!(locale = CAPTURE_LOCALE, "speech capture started");
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech capture failed to start");
                self.session.state = SpeechState::Errored;
                self.session.last_error = Some(GENERIC_ERROR_MESSAGE.to_string());
            }
        }
    }

    /// Ask the device to stop
    ///
    /// The machine keeps listening until the device reports `End`, so a
    /// result delivered for the audio heard so far is still submitted.
    pub fn stop(&mut self) {
        if self.session.state != SpeechState::Listening || self.stop_requested {
            return;
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.stop();
            self.stop_requested = true;
            tracing::debug!("speech capture stop requested");
        }
    }

    /// Start when idle, stop when capturing
    pub fn toggle(&mut self) {
        if self.is_capturing() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Route a device event to its handler
    pub fn dispatch(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Start => self.on_start(),
            CaptureEvent::Result(text) => self.on_result(&text),
            CaptureEvent::Error(kind) => self.on_error(&kind),
            CaptureEvent::End => self.on_end(),
        }
    }

    /// The device began capturing
    pub fn on_start(&mut self) {
        if self.session.state == SpeechState::Listening {
            self.session.transcript.clear();
            self.session.last_error = None;
        }
    }

    /// The device recognized an utterance
    pub fn on_result(&mut self, text: &str) {
        if self.session.state != SpeechState::Listening {
            tracing::debug!(state = ?self.session.state, "ignoring result outside listening");
            return;
        }

        tracing::info!(transcript = %text, "speech recognized");
        self.session.state = SpeechState::GotResult;
        self.session.transcript = text.to_string();
        self.sink.submit(text);
    }

    /// The device failed
    pub fn on_error(&mut self, kind: &CaptureErrorKind) {
        if self.session.state != SpeechState::Listening {
            tracing::debug!(state = ?self.session.state, ?kind, "ignoring error outside listening");
            return;
        }

        tracing::warn!(?kind, "speech capture error");
        self.session.state = SpeechState::Errored;
        self.session.last_error = Some(kind.user_message().to_string());
    }

    /// The device stopped capturing
    pub fn on_end(&mut self) {
        if self.session.state != SpeechState::Idle {
            tracing::debug!(from = ?self.session.state, "speech capture ended");
        }
        self.session.state = SpeechState::Idle;
        self.stop_requested = false;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl TranscriptSink for Recorder {
        fn submit(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }
    }

    struct FailingDevice;

    impl SpeechCapture for FailingDevice {
        fn start(&mut self) -> Result<()> {
            Err(crate::Error::Audio("device busy".to_string()))
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn test_error_codes_map_to_messages() {
        assert_eq!(CaptureErrorKind::from_code("no-speech"), CaptureErrorKind::NoSpeech);
        assert_eq!(CaptureErrorKind::from_code("network").user_message(), NETWORK_MESSAGE);
        assert_eq!(
            CaptureErrorKind::from_code("not-allowed").user_message(),
            MIC_BLOCKED_MESSAGE
        );
        assert_eq!(
            CaptureErrorKind::from_code("audio-capture").user_message(),
            GENERIC_ERROR_MESSAGE
        );
    }

    #[test]
    fn test_device_start_failure_is_reported() {
        let sink = Arc::new(Recorder::default());
        let mut input = SpeechInput::new(Some(Box::new(FailingDevice)), sink.clone());

        input.start();
        assert_eq!(input.state(), SpeechState::Errored);
        assert_eq!(input.last_error(), Some(GENERIC_ERROR_MESSAGE));
        assert!(!input.is_capturing());
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
