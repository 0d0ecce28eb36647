use std::path::PathBuf;

use crate::domain::{Message, MessageContent, MessageRole};
use crate::utils::image_utils::{InlineImage, load_thumbnail_async};
use crate::utils::is_remote_uri;

use super::{Part, Turn};

pub const DESCRIBE_IMAGE_PROMPT: &str = "Describe this image";
pub const IMAGE_UNREADABLE: &str = "[Image could not be loaded]";

/// Maps a message snapshot into model context.
///
/// The last message is dropped: it is the user turn that was just written and is
/// sent as the prompt instead. Local images are re-decoded; images that cannot be
/// read locally become text placeholders.
pub async fn build_history(messages: &[Message], max_side: u32) -> Vec<Turn> {
    let prior = match messages.split_last() {
        Some((_, prior)) => prior,
        None => return Vec::new(),
    };

    let mut history = Vec::with_capacity(prior.len());
    for message in prior {
        if let Some(part) = to_part(&message.content, max_side).await {
            history.push(Turn {
                role: message.role,
                parts: vec![part],
            });
        }
    }
    history
}

async fn to_part(content: &MessageContent, max_side: u32) -> Option<Part> {
    match content {
        MessageContent::Text { text } if text.is_empty() => None,
        MessageContent::Text { text } => Some(Part::Text(text.clone())),
        MessageContent::Image { uri } if uri.is_empty() => None,
        MessageContent::Image { uri } if is_remote_uri(uri) => {
            Some(Part::Text(format!("[Image: {}]", uri)))
        }
        MessageContent::Image { uri } => {
            match load_thumbnail_async(PathBuf::from(uri), max_side).await {
                Ok(image) => Some(inline(image)),
                Err(e) => {
                    tracing::warn!("Could not reload {} for history: {}", uri, e);
                    Some(Part::Text(IMAGE_UNREADABLE.to_string()))
                }
            }
        }
        MessageContent::File { name, .. } => Some(Part::Text(format!("[File: {}]", name))),
    }
}

fn inline(image: InlineImage) -> Part {
    Part::InlineData {
        mime_type: image.mime_type,
        data: image.bytes,
    }
}

/// The single-turn request used to describe a freshly attached image.
pub fn image_turn(image: InlineImage) -> Turn {
    Turn {
        role: MessageRole::User,
        parts: vec![inline(image), Part::Text(DESCRIBE_IMAGE_PROMPT.to_string())],
    }
}
