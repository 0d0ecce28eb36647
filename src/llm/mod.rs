mod gemini;
mod history;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::MessageRole;

pub use gemini::GeminiClient;
pub use history::{DESCRIBE_IMAGE_PROMPT, IMAGE_UNREADABLE, build_history, image_turn};

#[derive(Error, Debug)]
pub enum GenerativeError {
    #[error("Model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

/// One role-tagged unit of model context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: MessageRole,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Turn {
            role,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Turn::text(MessageRole::User, text)
    }
}

/// A hosted chat model.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Produces the next model turn for `contents`. `None` when the model returned
    /// no text.
    async fn generate(&self, contents: Vec<Turn>) -> Result<Option<String>, GenerativeError>;

    /// Continues a chat: `history` followed by the new `prompt`.
    async fn send_message(
        &self,
        mut history: Vec<Turn>,
        prompt: Turn,
    ) -> Result<Option<String>, GenerativeError> {
        history.push(prompt);
        self.generate(history).await
    }
}
