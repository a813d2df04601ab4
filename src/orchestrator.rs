//! Send orchestration
//!
//! Turns one piece of user text into a user message, two concurrent remote
//! calls, and exactly one bot message. At most one turn is in flight; while
//! it is, further submissions are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use crate::conversation::{ConversationStore, Sender, annotate};
use crate::gateway::RemoteGateway;
use crate::speech::TranscriptSink;

/// Bot message appended when either remote call fails
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Drives the conversation store from user input
#[derive(Clone)]
pub struct SendOrchestrator {
    gateway: Arc<dyn RemoteGateway>,
    store: ConversationStore,
    /// Text typed but not yet sent
    staged: Arc<Mutex<String>>,
    turns: Arc<AtomicU64>,
}

impl std::fmt::Debug for SendOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendOrchestrator")
            .field("store", &self.store)
            .field("turns", &self.turns.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SendOrchestrator {
    /// Create an orchestrator with a fresh conversation
    #[must_use]
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self::with_store(gateway, ConversationStore::new())
    }

    /// Create an orchestrator over an existing store
    #[must_use]
    pub fn with_store(gateway: Arc<dyn RemoteGateway>, store: ConversationStore) -> Self {
        Self {
            gateway,
            store,
            staged: Arc::new(Mutex::new(String::new())),
            turns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read-only handle to the conversation
    #[must_use]
    pub const fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Replace the staged input text
    pub fn stage(&self, text: impl Into<String>) {
        *self.staged.lock().unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    /// Currently staged input text
    #[must_use]
    pub fn staged(&self) -> String {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Submit whatever is staged
    ///
    /// The staged text is left in place when the submission is dropped.
    pub fn submit_staged(&self) -> Option<JoinHandle<()>> {
        let text = self.staged();
        self.submit(&text)
    }

    /// Start a conversation turn for `raw_text`
    ///
    /// The user message is appended before this returns; the remote calls
    /// run on a spawned task whose handle is returned. Returns `None` without
    /// touching any state when the text is blank or a turn is already in
    /// flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, raw_text: &str) -> Option<JoinHandle<()>> {
        let text = raw_text.trim();
        if text.is_empty() {
            return None;
        }

        if !self.store.try_begin() {
            tracing::debug!("turn already in flight, dropping submission");
            return None;
        }
        let guard = PendingGuard {
            store: self.store.clone(),
        };

        let turn = self.turns.fetch_add(1, Ordering::Relaxed) + 1;
        self.store.append(Sender::User, text, None);
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        tracing::info!(turn, chars = text.len(), "turn started");

        let gateway = Arc::clone(&self.gateway);
        let store = self.store.clone();
        let text = text.to_string();

        Some(tokio::spawn(async move {
            let _guard = guard;
            complete_turn(gateway.as_ref(), &store, &text, turn).await;
        }))
    }
}

impl TranscriptSink for SendOrchestrator {
    fn submit(&self, text: &str) {
        // Fire and forget: the turn completes on its own task
        drop(Self::submit(self, text));
    }
}

/// Run both remote calls and append the resulting bot message
///
/// Both calls always run to completion; the turn settles only after the
/// slower one returns.
async fn complete_turn(gateway: &dyn RemoteGateway, store: &ConversationStore, text: &str, turn: u64) {
    let (reply, emotion) = tokio::join!(gateway.get_reply(text), gateway.get_emotion(text));

    match (reply, emotion) {
        (Ok(reply), Ok(emotion)) => {
            tracing::info!(turn, emotion = %emotion.emotion, "turn complete");
            store.append(
                Sender::Bot,
                annotate(&reply.reply, &emotion.emotion),
                Some(emotion.emotion),
            );
        }
        (reply, emotion) => {
            for e in [reply.err(), emotion.err()].into_iter().flatten() {
                tracing::warn!(turn, endpoint = %e.endpoint(), error = %e, "remote call failed");
            }
            store.append(Sender::Bot, FALLBACK_REPLY, None);
        }
    }
}

/// Clears `pending` and requests a scroll however the turn ends
struct PendingGuard {
    store: ConversationStore,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.store.finish();
        self.store.request_scroll();
    }
}
