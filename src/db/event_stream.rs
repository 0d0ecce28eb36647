use serde::Deserialize;
use serde_json::Value;

use super::client::DbError;

/// One server-sent event as framed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Chunks may split lines or UTF-8 sequences anywhere; only complete lines are parsed.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => self.event = value.to_string(),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        events
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.event.is_empty() && self.data.is_empty() {
            return None;
        }

        Some(SseEvent {
            event: std::mem::take(&mut self.event),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Realtime database streaming events.
#[derive(Debug, Clone, PartialEq)]
pub enum DbEvent {
    Put { path: String, data: Value },
    Patch { path: String, data: Value },
    KeepAlive,
    Cancel(String),
    AuthRevoked,
}

#[derive(Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

impl DbEvent {
    /// Interprets a framed event. Unknown event names yield `None`.
    pub fn parse(event: &SseEvent) -> Result<Option<Self>, DbError> {
        let parsed = match event.event.as_str() {
            "put" | "patch" => {
                let body: PathData = serde_json::from_str(&event.data).map_err(|e| {
                    DbError::InvalidData(format!("Malformed {} event: {}", event.event, e))
                })?;
                if event.event == "put" {
                    DbEvent::Put {
                        path: body.path,
                        data: body.data,
                    }
                } else {
                    DbEvent::Patch {
                        path: body.path,
                        data: body.data,
                    }
                }
            }
            "keep-alive" => DbEvent::KeepAlive,
            "cancel" => DbEvent::Cancel(
                serde_json::from_str::<Option<String>>(&event.data)
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| event.data.clone()),
            ),
            "auth_revoked" => DbEvent::AuthRevoked,
            _ => return Ok(None),
        };

        Ok(Some(parsed))
    }
}
