//! Haven - conversational client with emotion-aware replies
//!
//! Every user turn is sent to two independent backends, a reply generator
//! and an emotion classifier. Their answers are merged into one bot message,
//! which can also be read aloud. Input can be typed or spoken.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │   Typed text            Speech input state machine   │
//! └───────────┬──────────────────────┬───────────────────┘
//!             │                      │ transcript
//! ┌───────────▼──────────────────────▼───────────────────┐
//! │                  Send orchestrator                   │
//! │        /chat  ─┬─   join   ─┬─  /emotion             │
//! └────────────────┴─────┬──────┴────────────────────────┘
//!                        │ append
//! ┌──────────────────────▼───────────────────────────────┐
//! │                 Conversation store                   │
//! └───────────┬──────────────────────┬───────────────────┘
//!             │ events               │ events
//!        Narration sync           Renderer
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod render;
pub mod session;
pub mod speech;
#[cfg(feature = "audio")]
pub mod voice;

pub use config::Config;
pub use conversation::{ConversationEvent, ConversationState, ConversationStore, Message, Sender};
pub use error::{Error, Result};
pub use gateway::{HttpGateway, RemoteCallError, RemoteGateway};
pub use orchestrator::{FALLBACK_REPLY, SendOrchestrator};
pub use session::ChatSession;
pub use speech::{
    CaptureErrorKind, CaptureEvent, NarrationSync, SpeechCapture, SpeechInput, SpeechState,
    SpeechSynthesis, TranscriptSink,
};
