use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ChatSession, Message, MessageContent, MessageRole};

// Wire form of a message's content, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ContentRow {
    Text {
        #[serde(default)]
        text: String,
    },
    Image {
        #[serde(default)]
        uri: String,
    },
    File {
        #[serde(default)]
        uri: String,
        #[serde(default)]
        name: String,
    },
}

impl From<&MessageContent> for ContentRow {
    fn from(content: &MessageContent) -> Self {
        match content {
            MessageContent::Text { text } => ContentRow::Text { text: text.clone() },
            MessageContent::Image { uri } => ContentRow::Image { uri: uri.clone() },
            MessageContent::File { uri, name } => ContentRow::File {
                uri: uri.clone(),
                name: name.clone(),
            },
        }
    }
}

impl From<ContentRow> for MessageContent {
    fn from(row: ContentRow) -> Self {
        match row {
            ContentRow::Text { text } => MessageContent::Text { text },
            ContentRow::Image { uri } => MessageContent::Image { uri },
            ContentRow::File { uri, name } => MessageContent::File { uri, name },
        }
    }
}

// Row stored at users/{uid}/chats/{chatId}/messages/{pushId}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "timeStamp", default)]
    pub time_stamp: i64,
}

impl MessageRow {
    pub fn from_message(message: &Message) -> Self {
        MessageRow {
            content: Some(ContentRow::from(&message.content)),
            role: Some(message.role.as_str().to_string()),
            time_stamp: message.timestamp,
        }
    }

    pub fn to_message(self) -> Message {
        let role = match self.role.as_deref() {
            Some(role) => MessageRole::parse(role).unwrap_or_else(|| {
                tracing::warn!("Unknown message role '{}', treating as user", role);
                MessageRole::User
            }),
            None => MessageRole::User,
        };

        Message {
            content: self.content.map(MessageContent::from).unwrap_or_default(),
            role,
            timestamp: self.time_stamp,
        }
    }

    pub fn to_value(&self) -> Result<Value, String> {
        serde_json::to_value(self).map_err(|e| format!("Failed to serialize message: {}", e))
    }
}

// Row stored at users/{uid}/chats/{chatId}; messages live beneath it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSessionRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

impl ChatSessionRow {
    pub fn new(id: &str, title: &str) -> Self {
        ChatSessionRow {
            id: id.to_string(),
            title: title.to_string(),
        }
    }

    pub fn to_value(&self) -> Result<Value, String> {
        serde_json::to_value(self).map_err(|e| format!("Failed to serialize session: {}", e))
    }
}

/// Decodes the children of `users/{uid}/chats` into sessions without messages.
///
/// Undecodable children are skipped.
pub fn decode_sessions(value: &Value) -> Vec<ChatSession> {
    let Value::Object(children) = value else {
        return Vec::new();
    };

    children
        .iter()
        .filter_map(|(key, child)| {
            match serde_json::from_value::<ChatSessionRow>(child.clone()) {
                Ok(row) => {
                    let id = if row.id.is_empty() {
                        key.clone()
                    } else {
                        row.id
                    };
                    Some(ChatSession::new(id, row.title))
                }
                Err(e) => {
                    tracing::warn!("Skipping chat session {}: {}", key, e);
                    None
                }
            }
        })
        .collect()
}

/// Decodes the children of a `messages` node, ordered by timestamp then push id.
///
/// Undecodable children are skipped.
pub fn decode_messages(value: &Value) -> Vec<Message> {
    let Value::Object(children) = value else {
        return Vec::new();
    };

    let mut keyed: Vec<(&String, Message)> = children
        .iter()
        .filter_map(|(key, child)| {
            match serde_json::from_value::<MessageRow>(child.clone()) {
                Ok(row) => Some((key, row.to_message())),
                Err(e) => {
                    tracing::warn!("Error parsing message {}: {}", key, e);
                    None
                }
            }
        })
        .collect();

    keyed.sort_by(|(a_key, a), (b_key, b)| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a_key.cmp(b_key))
    });

    keyed.into_iter().map(|(_, message)| message).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_row_wire_format() {
        let message = Message::user_text("hello").with_timestamp(1_700_000_000_123);
        let value = MessageRow::from_message(&message).to_value().unwrap();

        assert_eq!(
            value,
            json!({
                "content": {"type": "TEXT", "text": "hello"},
                "role": "user",
                "timeStamp": 1_700_000_000_123_i64,
            })
        );
    }

    #[test]
    fn test_file_content_wire_format() {
        let row = ContentRow::from(&MessageContent::file("/tmp/a.pdf", "a.pdf"));
        assert_eq!(
            serde_json::to_value(row).unwrap(),
            json!({"type": "FILE", "uri": "/tmp/a.pdf", "name": "a.pdf"})
        );
    }

    #[test]
    fn test_decode_messages_sorts_and_skips_bad_rows() {
        let value = json!({
            "-Nb": {"content": {"type": "TEXT", "text": "second"}, "role": "model", "timeStamp": 20},
            "-Na": {"content": {"type": "IMAGE", "uri": "https://x/y.png"}, "role": "user", "timeStamp": 10},
            "-Nc": {"content": {"type": "VIDEO"}, "role": "user", "timeStamp": 5},
            "-Nd": "garbage",
        });

        let messages = decode_messages(&value);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, MessageContent::image("https://x/y.png"));
        assert_eq!(messages[1].role, MessageRole::Model);
    }

    #[test]
    fn test_decode_messages_equal_timestamps_follow_push_id() {
        let value = json!({
            "-Nz": {"content": {"type": "TEXT", "text": "b"}, "role": "user", "timeStamp": 7},
            "-Na": {"content": {"type": "TEXT", "text": "a"}, "role": "user", "timeStamp": 7},
        });

        let texts: Vec<String> = decode_messages(&value)
            .into_iter()
            .filter_map(|m| m.content.as_text().map(str::to_string))
            .collect();

        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_message_defaults() {
        let value = json!({"-Na": {"timeStamp": 3}, "-Nb": {"role": "system", "timeStamp": 4}});
        let messages = decode_messages(&value);

        assert_eq!(messages[0].content, MessageContent::text(""));
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::User);
    }

    #[test]
    fn test_decode_sessions_uses_key_when_id_missing() {
        let value = json!({
            "c1": {"id": "c1", "title": "Chat 1", "messages": {"-Na": {"timeStamp": 1}}},
            "c2": {"title": "Chat 2"},
        });

        let sessions = decode_sessions(&value);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].id, "c2");
        assert!(sessions[0].messages.is_empty());
    }

    #[test]
    fn test_decode_null_is_empty() {
        assert!(decode_sessions(&Value::Null).is_empty());
        assert!(decode_messages(&Value::Null).is_empty());
    }
}
