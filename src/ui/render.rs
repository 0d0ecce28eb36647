use crate::domain::{ChatSession, FileKind, Message, MessageContent, MessageRole};

pub fn render_sessions(sessions: &[ChatSession], selected: Option<&str>) -> String {
    if sessions.is_empty() {
        return "No chats yet. Type /new to start one.".to_string();
    }

    sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let marker = if selected == Some(session.id.as_str()) { '*' } else { ' ' };
            format!("{} {:>2}. {}", marker, i + 1, session.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_message(message: &Message) -> String {
    let speaker = match message.role {
        MessageRole::User => "you",
        MessageRole::Model => "gemini",
    };
    format!("{}> {}", speaker, render_content(&message.content))
}

fn render_content(content: &MessageContent) -> String {
    match content {
        MessageContent::Text { text } => text.clone(),
        MessageContent::Image { uri } => format!("[image] {}", uri),
        MessageContent::File { name, .. } => {
            format!("[{}] {}", FileKind::from_name(name).label(), name)
        }
    }
}

pub fn render_thread(title: &str, messages: &[Message]) -> String {
    let mut out = format!("== {} ==", title);
    if messages.is_empty() {
        out.push_str("\n(no messages yet)");
    }
    for message in messages {
        out.push('\n');
        out.push_str(&render_message(message));
    }
    out
}

/// Tracks what part of the selected thread is already on screen.
#[derive(Debug, Default)]
pub struct ThreadView {
    chat_id: Option<String>,
    shown: Vec<Message>,
}

impl ThreadView {
    /// Text to print for the latest snapshot: the whole thread after a switch or a
    /// non-append change, the new tail otherwise.
    pub fn update(
        &mut self,
        chat_id: Option<&str>,
        title: &str,
        messages: &[Message],
    ) -> Option<String> {
        if self.chat_id.as_deref() != chat_id || !messages.starts_with(&self.shown) {
            self.chat_id = chat_id.map(String::from);
            self.shown = messages.to_vec();
            return Some(match chat_id {
                Some(_) => render_thread(title, messages),
                None => "No chat selected. Type /new or /open <n>.".to_string(),
            });
        }

        if messages.len() == self.shown.len() {
            return None;
        }

        let tail = messages[self.shown.len()..]
            .iter()
            .map(render_message)
            .collect::<Vec<_>>()
            .join("\n");
        self.shown = messages.to_vec();
        Some(tail)
    }
}
