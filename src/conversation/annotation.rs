//! Emotion annotation carried in bot message text
//!
//! A successful turn renders as `"<reply> (Emotion: <label>)"`. Renderers and
//! the narrator need the reply without the suffix, and older messages may only
//! carry the label inside the text.

use std::sync::LazyLock;

use regex::Regex;

/// Trailing `(Emotion: …)` annotation, with optional surrounding whitespace
static EMOTION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(Emotion:\s*(.*?)\)\s*$").expect("valid regex")
});

/// Merge a reply and its emotion label into display text
#[must_use]
pub fn annotate(reply: &str, emotion: &str) -> String {
    format!("{reply} (Emotion: {emotion})")
}

/// Remove a trailing emotion annotation
///
/// Text without an annotation is returned unchanged.
#[must_use]
pub fn strip_emotion(text: &str) -> &str {
    EMOTION_SUFFIX
        .find(text)
        .map_or(text, |m| &text[..m.start()])
}

/// Extract the label from a trailing emotion annotation
#[must_use]
pub fn parse_emotion(text: &str) -> Option<&str> {
    EMOTION_SUFFIX
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|label| !label.is_empty())
}
