//! Remote calls to the reply and emotion backends
//!
//! Each outgoing message fans out into two independent exchanges. The gateway
//! performs exactly one request per call and never retries; what to do with a
//! failure is the orchestrator's decision.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpGateway;

/// Request body shared by both endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
}

/// Body returned by the reply endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyResponse {
    pub reply: String,
}

/// Body returned by the emotion endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmotionResponse {
    pub emotion: String,
}

/// Which of the two remote calls failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Reply,
    Emotion,
}

impl Endpoint {
    /// Path relative to the backend base location
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Reply => "chat",
            Self::Emotion => "emotion",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reply => f.write_str("reply"),
            Self::Emotion => f.write_str("emotion"),
        }
    }
}

/// A remote call that did not produce a usable result
#[derive(Debug, Error)]
pub enum RemoteCallError {
    /// The request never completed (connection refused, reset, ...)
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status
    #[error("{endpoint} API error {status}: {body}")]
    Status {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    /// The body could not be parsed as the expected payload
    #[error("{endpoint} response malformed: {reason}")]
    Decode { endpoint: Endpoint, reason: String },
}

impl RemoteCallError {
    /// The call that failed
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => *endpoint,
        }
    }
}

/// The two operations a conversation turn needs from the backend
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Generate a reply to `text`
    async fn get_reply(&self, text: &str) -> Result<ReplyResponse, RemoteCallError>;

    /// Classify the emotion expressed in `text`
    async fn get_emotion(&self, text: &str) -> Result<EmotionResponse, RemoteCallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(ChatRequest {
            message: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "message": "hello" }));
    }

    #[test]
    fn test_response_ignores_extra_fields() {
        let reply: ReplyResponse =
            serde_json::from_str(r#"{"reply":"hi there","emotion":"neutral"}"#).unwrap();
        assert_eq!(reply.reply, "hi there");
    }

    #[test]
    fn test_error_reports_endpoint() {
        let err = RemoteCallError::Status {
            endpoint: Endpoint::Emotion,
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.endpoint(), Endpoint::Emotion);
        assert_eq!(err.to_string(), "emotion API error 500: boom");
    }
}
