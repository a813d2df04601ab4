//! Audio-backed speech capabilities
//!
//! Microphone capture with energy endpointing and cloud transcription, and
//! narration through cloud TTS and the default speaker. Both need the
//! `OpenAI` API key.

mod capture;
mod endpoint;
mod microphone;
mod narration;
mod playback;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use endpoint::{EndpointState, UtteranceDetector};
pub use microphone::MicrophoneCapture;
pub use narration::SpokenNarration;
pub use playback::AudioPlayback;
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
