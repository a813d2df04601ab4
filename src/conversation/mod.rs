//! Conversation log and in-flight flag
//!
//! The store is the single source of truth for rendering. Only the send
//! orchestrator mutates it; everyone else reads snapshots or subscribes to
//! [`ConversationEvent`]s.

mod annotation;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use annotation::{annotate, parse_emotion, strip_emotion};

/// Channel capacity for conversation event broadcasts
const CHANNEL_CAPACITY: usize = 64;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Display text, emotion annotation already merged in for bot replies
    pub text: String,
    /// Author of the message
    pub sender: Sender,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    /// Classifier label, only on bot replies whose turn succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
}

impl Message {
    /// Whether the bot authored this message
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    /// Text with any trailing emotion annotation removed
    #[must_use]
    pub fn display_text(&self) -> &str {
        strip_emotion(&self.text)
    }

    /// Emotion label to show next to the message
    ///
    /// Prefers the `emotion` field and falls back to the annotation in the text.
    #[must_use]
    pub fn emotion_label(&self) -> Option<&str> {
        self.emotion.as_deref().or_else(|| parse_emotion(&self.text))
    }
}

/// Snapshot of the conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationState {
    /// Messages in insertion order
    pub messages: Vec<Message>,
    /// A turn is in flight
    pub pending: bool,
}

/// Change notifications emitted by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A message was appended to the log
    MessageAppended(Message),
    /// The in-flight flag changed
    PendingChanged(bool),
    /// The view should scroll to the newest entry
    ScrollToLatest,
}

/// Shared handle to the conversation state
///
/// Cloning the handle shares the underlying log.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    state: Arc<Mutex<ConversationState>>,
    tx: broadcast::Sender<ConversationEvent>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(ConversationState::default())),
            tx,
        }
    }

    /// Subscribe to store changes
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.tx.subscribe()
    }

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> ConversationState {
        self.lock().clone()
    }

    /// Copy of the message log
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// Number of messages in the log
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// Whether a turn is in flight
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Set `pending` if it is clear
    ///
    /// Returns false without touching the state when a turn is already in
    /// flight. Check and set happen under one lock.
    pub(crate) fn try_begin(&self) -> bool {
        {
            let mut state = self.lock();
            if state.pending {
                return false;
            }
            state.pending = true;
        }
        let _ = self.tx.send(ConversationEvent::PendingChanged(true));
        true
    }

    /// Clear the in-flight flag
    pub(crate) fn finish(&self) {
        let changed = {
            let mut state = self.lock();
            std::mem::replace(&mut state.pending, false)
        };
        if changed {
            let _ = self.tx.send(ConversationEvent::PendingChanged(false));
        }
    }

    /// Append a message stamped with the current time
    ///
    /// The timestamp never goes backwards relative to the previous entry.
    pub(crate) fn append(
        &self,
        sender: Sender,
        text: impl Into<String>,
        emotion: Option<String>,
    ) -> Message {
        let message = {
            let mut state = self.lock();
            let now = chrono::Utc::now().timestamp_millis();
            let timestamp = state
                .messages
                .last()
                .map_or(now, |last| now.max(last.timestamp));
            let message = Message {
                text: text.into(),
                sender,
                timestamp,
                emotion,
            };
            state.messages.push(message.clone());
            message
        };

        tracing::trace!(sender = ?message.sender, timestamp = message.timestamp, "message appended");

        // No subscribers is fine
        let _ = self.tx.send(ConversationEvent::MessageAppended(message.clone()));
        message
    }

    /// Ask the render layer to scroll to the newest entry
    pub(crate) fn request_scroll(&self) {
        let _ = self.tx.send(ConversationEvent::ScrollToLatest);
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let store = ConversationStore::new();
        store.append(Sender::User, "first", None);
        store.append(Sender::Bot, "second", None);

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[1].text, "second");
        assert!(messages[0].timestamp <= messages[1].timestamp);
    }

    #[test]
    fn test_try_begin_is_exclusive() {
        let store = ConversationStore::new();
        assert!(store.try_begin());
        assert!(!store.try_begin());
        store.finish();
        assert!(!store.is_pending());
        assert!(store.try_begin());
    }

    #[test]
    fn test_events_are_broadcast() {
        let store = ConversationStore::new();
        let mut rx = store.subscribe();

        assert!(store.try_begin());
        let message = store.append(Sender::User, "hi", None);
        store.finish();
        store.request_scroll();

        assert_eq!(rx.try_recv().unwrap(), ConversationEvent::PendingChanged(true));
        assert_eq!(rx.try_recv().unwrap(), ConversationEvent::MessageAppended(message));
        assert_eq!(rx.try_recv().unwrap(), ConversationEvent::PendingChanged(false));
        assert_eq!(rx.try_recv().unwrap(), ConversationEvent::ScrollToLatest);
    }

    #[test]
    fn test_finish_without_begin_is_silent() {
        let store = ConversationStore::new();
        let mut rx = store.subscribe();
        store.finish();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_emotion_label_falls_back_to_text() {
        let message = Message {
            text: "take care (Emotion: negative)".to_string(),
            sender: Sender::Bot,
            timestamp: 0,
            emotion: None,
        };
        assert_eq!(message.emotion_label(), Some("negative"));
        assert_eq!(message.display_text(), "take care");
    }

    #[test]
    fn test_message_serializes_sender_lowercase() {
        let message = Message {
            text: "hi".to_string(),
            sender: Sender::User,
            timestamp: 1,
            emotion: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["sender"], "user");
        assert!(json.get("emotion").is_none());
    }
}
