//! Shared test utilities
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use haven_chat::gateway::{EmotionResponse, Endpoint, RemoteCallError, ReplyResponse};
use haven_chat::{ConversationStore, RemoteGateway, SpeechCapture, SpeechSynthesis, TranscriptSink};
use tokio::sync::watch;

/// What a scripted endpoint answers
#[derive(Debug, Clone)]
pub enum Outcome {
    Ok(String),
    Fail,
}

/// A call observed by the scripted gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedCall {
    pub endpoint: Endpoint,
    pub text: String,
    /// Messages in the store when the call was issued
    pub log_len: usize,
}

/// Gateway with fixed answers and optional per-endpoint gates holding calls open
pub struct ScriptedGateway {
    reply: Outcome,
    emotion: Outcome,
    reply_gate: watch::Receiver<bool>,
    emotion_gate: watch::Receiver<bool>,
    store: Mutex<Option<ConversationStore>>,
    calls: Mutex<Vec<ObservedCall>>,
    settled: AtomicUsize,
}

impl ScriptedGateway {
    /// Gateway that answers immediately
    pub fn new(reply: Outcome, emotion: Outcome) -> Arc<Self> {
        Arc::new(Self::build(reply, emotion, open_gate(), open_gate()))
    }

    /// Gateway whose calls wait until the returned sender sends `true`
    pub fn gated(reply: Outcome, emotion: Outcome) -> (Arc<Self>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Arc::new(Self::build(reply, emotion, rx.clone(), rx)), tx)
    }

    /// Gateway whose reply answers at once while the emotion call waits
    pub fn gated_emotion(reply: Outcome, emotion: Outcome) -> (Arc<Self>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Arc::new(Self::build(reply, emotion, open_gate(), rx)), tx)
    }

    fn build(
        reply: Outcome,
        emotion: Outcome,
        reply_gate: watch::Receiver<bool>,
        emotion_gate: watch::Receiver<bool>,
    ) -> Self {
        Self {
            reply,
            emotion,
            reply_gate,
            emotion_gate,
            store: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            settled: AtomicUsize::new(0),
        }
    }

    /// Record the store size seen by each call
    pub fn observe(&self, store: &ConversationStore) {
        *self.store.lock().unwrap() = Some(store.clone());
    }

    pub fn calls(&self) -> Vec<ObservedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that ran to completion rather than being dropped
    pub fn settled(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }

    async fn answer(&self, endpoint: Endpoint, text: &str) -> Result<String, RemoteCallError> {
        let log_len = self.store.lock().unwrap().as_ref().map_or(0, ConversationStore::len);
        self.calls.lock().unwrap().push(ObservedCall {
            endpoint,
            text: text.to_string(),
            log_len,
        });

        let (outcome, gate) = match endpoint {
            Endpoint::Reply => (&self.reply, &self.reply_gate),
            Endpoint::Emotion => (&self.emotion, &self.emotion_gate),
        };
        let mut gate = gate.clone();
        let _ = gate.wait_for(|open| *open).await;
        self.settled.fetch_add(1, Ordering::SeqCst);

        match outcome {
            Outcome::Ok(value) => Ok(value.clone()),
            Outcome::Fail => Err(RemoteCallError::Status {
                endpoint,
                status: 500,
                body: "scripted failure".to_string(),
            }),
        }
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn get_reply(&self, text: &str) -> Result<ReplyResponse, RemoteCallError> {
        self.answer(Endpoint::Reply, text)
            .await
            .map(|reply| ReplyResponse { reply })
    }

    async fn get_emotion(&self, text: &str) -> Result<EmotionResponse, RemoteCallError> {
        self.answer(Endpoint::Emotion, text)
            .await
            .map(|emotion| EmotionResponse { emotion })
    }
}

/// A gate that never closes
fn open_gate() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(true);
    // Keep the gate open for the lifetime of the test
    std::mem::forget(tx);
    rx
}

/// Transcript sink that remembers every submission
#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<String>>);

impl RecordingSink {
    pub fn submitted(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl TranscriptSink for RecordingSink {
    fn submit(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }
}

/// Counters shared with a [`FakeCapture`]
#[derive(Default)]
pub struct CaptureCalls {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

/// Capture device that only counts calls
pub struct FakeCapture(pub Arc<CaptureCalls>);

impl FakeCapture {
    pub fn boxed() -> (Box<dyn SpeechCapture>, Arc<CaptureCalls>) {
        let calls = Arc::new(CaptureCalls::default());
        (Box::new(Self(Arc::clone(&calls))), calls)
    }
}

impl SpeechCapture for FakeCapture {
    fn start(&mut self) -> haven_chat::Result<()> {
        self.0.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.0.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synthesizer that tracks how many narrations overlap
#[derive(Default)]
pub struct FakeSynth {
    active: AtomicUsize,
    max_active: AtomicUsize,
    cancels: AtomicUsize,
    spoken: Mutex<Vec<String>>,
}

impl FakeSynth {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl SpeechSynthesis for FakeSynth {
    fn speak(&self, text: &str) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.spoken.lock().unwrap().push(text.to_string());
    }

    fn cancel_all(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.active.store(0, Ordering::SeqCst);
    }
}

/// Poll `condition` until it holds or a second passes
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
