//! Error types for Haven

use thiserror::Error;

/// Result type alias for Haven operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside a conversation turn
///
/// Failures inside a turn never surface here: remote call failures are
/// folded into the fallback message and capture failures into the speech
/// session's inline message.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A capability the environment does not provide
    #[error("unsupported capability: {0}")]
    Unsupported(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
