use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod http_chat;
pub use http_chat::HttpChatEngine;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// One completion call. The key travels with the request because it can be
/// changed through settings while the server runs.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Error)]
#[error("completion error: {message}")]
pub struct CompletionError {
    pub message: String,
}

impl CompletionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Text of the first choice.
    async fn complete(&self, req: CompletionRequest) -> Result<String, CompletionError>;
}

/// Offline engine that answers every request with the same text.
pub struct StubEngine {
    reply: String,
}

impl StubEngine {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new(r#"{"message": "stub engine: no model call was made"}"#)
    }
}

#[async_trait]
impl CompletionEngine for StubEngine {
    async fn complete(&self, _req: CompletionRequest) -> Result<String, CompletionError> {
        Ok(self.reply.clone())
    }
}
