pub mod settings;

pub use settings::{
    AppConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, FirebaseConfig, GeminiConfig,
    Settings,
};
