//! Microphone speech capture
//!
//! One `start` records a single utterance on a dedicated thread, transcribes
//! it, and reports `Start`, then `Result` or `Error`, then `End`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::endpoint::UtteranceDetector;
use super::stt::SpeechToText;
use crate::speech::{CaptureErrorKind, CaptureEvent, SpeechCapture};
use crate::{Error, Result};

/// How often the recording thread drains the microphone buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Give up when nothing is said for this long
const NO_SPEECH_TIMEOUT: Duration = Duration::from_secs(8);

/// Hard cap on a single utterance
const MAX_UTTERANCE: Duration = Duration::from_secs(30);

struct Recording {
    stop: Arc<AtomicBool>,
    /// Set by the recording thread just before it reports `End`
    finished: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl Recording {
    fn is_active(&self) -> bool {
        !self.finished.load(Ordering::Acquire) && !self.thread.is_finished()
    }
}

/// Speech capture backed by the default microphone and a transcription API
pub struct MicrophoneCapture {
    stt: Arc<SpeechToText>,
    events: mpsc::UnboundedSender<CaptureEvent>,
    runtime: Handle,
    recording: Option<Recording>,
}

impl MicrophoneCapture {
    /// Create a capture device that reports on `events`
    ///
    /// # Errors
    ///
    /// Returns error if called outside a tokio runtime
    pub fn new(stt: SpeechToText, events: mpsc::UnboundedSender<CaptureEvent>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Unsupported(format!("speech capture needs a runtime: {e}")))?;

        Ok(Self {
            stt: Arc::new(stt),
            events,
            runtime,
            recording: None,
        })
    }

    fn is_recording(&self) -> bool {
        self.recording.as_ref().is_some_and(Recording::is_active)
    }
}

impl SpeechCapture for MicrophoneCapture {
    fn start(&mut self) -> Result<()> {
        if self.is_recording() {
            return Ok(());
        }

        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let session = Session {
            stop: Arc::clone(&stop),
            finished: Arc::clone(&finished),
            events: self.events.clone(),
            stt: Arc::clone(&self.stt),
            runtime: self.runtime.clone(),
        };

        let thread = std::thread::Builder::new()
            .name("haven-mic".to_string())
            .spawn(move || session.run())?;

        // A previous thread past its `End` only has to return; let it go
        self.recording = Some(Recording {
            stop,
            finished,
            thread,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(recording) = &self.recording {
            recording.stop.store(true, Ordering::Relaxed);
        }
    }
}

/// State owned by one recording thread
struct Session {
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<CaptureEvent>,
    stt: Arc<SpeechToText>,
    runtime: Handle,
}

impl Session {
    fn run(self) {
        self.emit(CaptureEvent::Start);
        if let Err(kind) = self.capture() {
            self.emit(CaptureEvent::Error(kind));
        }
        self.finished.store(true, Ordering::Release);
        self.emit(CaptureEvent::End);
    }

    fn capture(&self) -> std::result::Result<(), CaptureErrorKind> {
        let mut mic = AudioCapture::new()
            .and_then(|mut mic| mic.start().map(|()| mic))
            .map_err(|e| {
                tracing::warn!(error = %e, "microphone unavailable");
                CaptureErrorKind::NotAllowed
            })?;

        let mut detector = UtteranceDetector::new();
        let started = Instant::now();

        loop {
            std::thread::sleep(POLL_INTERVAL);

            if detector.process(&mic.take_buffer()) || self.stop.load(Ordering::Relaxed) {
                break;
            }
            if !detector.heard_speech() && started.elapsed() > NO_SPEECH_TIMEOUT {
                break;
            }
            if started.elapsed() > MAX_UTTERANCE {
                tracing::debug!("utterance cap reached");
                break;
            }
        }
        mic.stop();

        if !detector.heard_speech() {
            return Err(CaptureErrorKind::NoSpeech);
        }

        let wav = samples_to_wav(&detector.take_speech_buffer(), SAMPLE_RATE).map_err(|e| {
            tracing::warn!(error = %e, "failed to encode utterance");
            CaptureErrorKind::Other("audio-capture".to_string())
        })?;

        let transcript = self
            .runtime
            .block_on(self.stt.transcribe(&wav))
            .map_err(|e| {
                tracing::warn!(error = %e, "transcription failed");
                CaptureErrorKind::Network
            })?;

        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(CaptureErrorKind::NoSpeech);
        }

        self.emit(CaptureEvent::Result(transcript.to_string()));
        Ok(())
    }

    fn emit(&self, event: CaptureEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("capture event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_inactive_once_end_is_reported() {
        let (release, wait) = std::sync::mpsc::channel::<()>();
        let finished = Arc::new(AtomicBool::new(false));
        let recording = Recording {
            stop: Arc::new(AtomicBool::new(false)),
            finished: Arc::clone(&finished),
            thread: std::thread::spawn(move || {
                let _ = wait.recv();
            }),
        };
        assert!(recording.is_active());

        // Thread still running, but its session is over
        finished.store(true, Ordering::Release);
        assert!(!recording.is_active());

        drop(release);
        recording.thread.join().unwrap();
    }
}
