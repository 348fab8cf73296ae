//! Text generation used by the autonomous worker.

mod anthropic;

pub use anthropic::{AnthropicClient, DEFAULT_ANTHROPIC_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures from a text generator. All of them are treated as transient by
/// callers: the work is retried on a later tick.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("AI response contained no text")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Produces a completion for a system prompt and conversation.
///
/// The credential travels with each call so one generator serves every
/// project.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(
        &self,
        credential: &str,
        system: &str,
        conversation: &[ChatMessage],
    ) -> Result<String, AiError>;
}
