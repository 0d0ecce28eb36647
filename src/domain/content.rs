use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum MessageContent {
    Text { text: String },
    /// Local file path or remote download URL.
    Image { uri: String },
    File { uri: String, name: String },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text { text: text.into() }
    }

    pub fn image(uri: impl Into<String>) -> Self {
        MessageContent::Image { uri: uri.into() }
    }

    pub fn file(uri: impl Into<String>, name: impl Into<String>) -> Self {
        MessageContent::File {
            uri: uri.into(),
            name: name.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } => Some(text),
            _ => None,
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::text("")
    }
}

/// Coarse file kind used to pick a label for file attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Document,
    Spreadsheet,
    Other,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => FileKind::Pdf,
            "doc" | "docx" => FileKind::Document,
            "xls" | "xlsx" => FileKind::Spreadsheet,
            _ => FileKind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Document => "doc",
            FileKind::Spreadsheet => "sheet",
            FileKind::Other => "file",
        }
    }
}
