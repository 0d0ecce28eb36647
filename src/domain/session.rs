use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::message::Message;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    /// Keyed by push id.
    pub messages: BTreeMap<String, Message>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        ChatSession {
            id: id.into(),
            title: title.into(),
            messages: BTreeMap::new(),
        }
    }
}

/// Title given to the next session created when `existing` sessions are present.
pub fn next_session_title(existing: usize) -> String {
    format!("Chat {}", existing + 1)
}
