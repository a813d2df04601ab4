//! Utterance endpointing
//!
//! Decides when the speaker has finished: some speech, then enough silence.
//! Energy based, no model involved.

/// RMS energy above which a chunk counts as speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech before an utterance can end (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends an utterance (0.5s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Whether speech has been heard yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for the first speech chunk
    Waiting,
    /// Speech heard, accumulating until trailing silence
    Speaking,
}

/// Accumulates one utterance from a stream of sample chunks
#[derive(Debug)]
pub struct UtteranceDetector {
    state: EndpointState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: EndpointState::Waiting,
            speech_buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed a chunk; returns true once the utterance is complete
    pub fn process(&mut self, samples: &[f32]) -> bool {
        if samples.is_empty() {
            return self.is_complete();
        }

        let is_speech = calculate_energy(samples) > ENERGY_THRESHOLD;

        match self.state {
            EndpointState::Waiting => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!("speech onset");
                }
            }
            EndpointState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);
                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }
            }
        }

        self.is_complete()
    }

    /// Speech followed by enough silence
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == EndpointState::Speaking
            && self.silence_counter > SILENCE_SAMPLES
            && self.speech_buffer.len() > MIN_SPEECH_SAMPLES
    }

    /// Whether any speech has been heard
    #[must_use]
    pub fn heard_speech(&self) -> bool {
        self.state == EndpointState::Speaking
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Samples accumulated since speech onset
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Take the accumulated utterance, resetting the detector
    pub fn take_speech_buffer(&mut self) -> Vec<f32> {
        self.state = EndpointState::Waiting;
        self.silence_counter = 0;
        std::mem::take(&mut self.speech_buffer)
    }
}

/// RMS energy of a chunk
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::SAMPLE_RATE;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn tone(duration_secs: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration_secs) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn silence(duration_secs: f32) -> Vec<f32> {
        vec![0.0; (SAMPLE_RATE as f32 * duration_secs) as usize]
    }

    #[test]
    fn test_energy_calculation() {
        assert!(calculate_energy(&[0.0; 100]) < 0.001);
        assert!(calculate_energy(&[0.5; 100]) > 0.4);
    }

    #[test]
    fn test_silence_never_starts() {
        let mut detector = UtteranceDetector::new();
        assert!(!detector.process(&silence(2.0)));
        assert_eq!(detector.state(), EndpointState::Waiting);
        assert!(detector.speech_buffer().is_empty());
    }

    #[test]
    fn test_speech_then_silence_completes() {
        let mut detector = UtteranceDetector::new();
        assert!(!detector.process(&tone(0.5)));
        assert!(detector.heard_speech());
        assert!(!detector.process(&silence(0.2)));
        assert!(detector.process(&silence(0.4)));
    }

    #[test]
    fn test_pause_mid_sentence_does_not_complete() {
        let mut detector = UtteranceDetector::new();
        detector.process(&tone(0.5));
        assert!(!detector.process(&silence(0.3)));
        assert!(!detector.process(&tone(0.2)));
        assert!(!detector.process(&silence(0.3)));
    }

    #[test]
    fn test_take_resets() {
        let mut detector = UtteranceDetector::new();
        let speech = tone(0.2);
        detector.process(&speech);
        let taken = detector.take_speech_buffer();
        assert_eq!(taken.len(), speech.len());
        assert_eq!(detector.state(), EndpointState::Waiting);
        assert!(detector.speech_buffer().is_empty());
    }
}
