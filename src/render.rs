//! Terminal rendering of the conversation

use crate::conversation::{Message, Sender};
use crate::speech::{SpeechSession, SpeechState};

/// Line shown while a turn is in flight
pub const TYPING_INDICATOR: &str = "Bot is typing…";

/// One line for a message: author, text, and an emotion pill for bot replies
#[must_use]
pub fn format_message(message: &Message) -> String {
    let author = match message.sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    };

    match message.emotion_label() {
        Some(label) if message.is_bot() => {
            format!("{author}> {} [{label}]", message.display_text())
        }
        _ => format!("{author}> {}", message.display_text()),
    }
}

/// Label for the voice toggle
#[must_use]
pub const fn toggle_label(capturing: bool) -> &'static str {
    if capturing { "Listening..." } else { "Start talking" }
}

/// Status lines for the speech session, if there is anything to show
#[must_use]
pub fn speech_status(session: &SpeechSession) -> Vec<String> {
    let mut lines = Vec::new();

    if session.state == SpeechState::Listening {
        lines.push(format!("({})", toggle_label(true)));
    }
    if !session.transcript.is_empty() {
        lines.push(format!("You said: \"{}\"", session.transcript));
    }
    if let Some(error) = &session.last_error {
        lines.push(format!("! {error}"));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: Sender, text: &str, emotion: Option<&str>) -> Message {
        Message {
            text: text.to_string(),
            sender,
            timestamp: 0,
            emotion: emotion.map(ToString::to_string),
        }
    }

    #[test]
    fn test_bot_message_shows_pill() {
        let m = message(Sender::Bot, "hang in there (Emotion: negative)", Some("negative"));
        assert_eq!(format_message(&m), "bot> hang in there [negative]");
    }

    #[test]
    fn test_fallback_has_no_pill() {
        let m = message(Sender::Bot, crate::FALLBACK_REPLY, None);
        assert_eq!(format_message(&m), format!("bot> {}", crate::FALLBACK_REPLY));
    }

    #[test]
    fn test_user_message() {
        let m = message(Sender::User, "I feel tired", None);
        assert_eq!(format_message(&m), "you> I feel tired");
    }

    #[test]
    fn test_speech_status() {
        let session = SpeechSession {
            state: SpeechState::Idle,
            transcript: "hello".to_string(),
            last_error: None,
        };
        assert_eq!(speech_status(&session), vec!["You said: \"hello\"".to_string()]);

        let listening = SpeechSession {
            state: SpeechState::Listening,
            ..SpeechSession::default()
        };
        assert_eq!(speech_status(&listening), vec!["(Listening...)".to_string()]);
    }
}
