use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::content::MessageContent;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub content: MessageContent,
    pub role: MessageRole,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Model,
}

impl MessageRole {
    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::User => "user",
            MessageRole::Model => "model",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageRole::User),
            "model" => Some(MessageRole::Model),
            _ => None,
        }
    }
}

impl Message {
    pub fn new(content: MessageContent, role: MessageRole) -> Self {
        Message {
            content,
            role,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Message::new(MessageContent::text(text), MessageRole::User)
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Message::new(MessageContent::text(text), MessageRole::Model)
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_model(&self) -> bool {
        self.role == MessageRole::Model
    }
}
