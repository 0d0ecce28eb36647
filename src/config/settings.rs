use std::env;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone)]
pub struct Settings {
    pub firebase: FirebaseConfig,
    pub gemini: GeminiConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub database_url: String,
    pub api_key: String,
    pub storage_bucket: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub history_timeout_ms: u64,
    pub thumbnail_max_side: u32,
    pub google_id_token: Option<String>,
}

impl AppConfig {
    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            history_timeout_ms: 5000,
            thumbnail_max_side: 1024,
            google_id_token: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, String> {
        Ok(Settings {
            firebase: FirebaseConfig {
                database_url: env::var("FIREBASE_DATABASE_URL")
                    .unwrap_or_default()
                    .trim_end_matches('/')
                    .to_string(),
                api_key: env::var("FIREBASE_API_KEY").unwrap_or_default(),
                storage_bucket: env::var("FIREBASE_STORAGE_BUCKET")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
            },
            gemini: GeminiConfig {
                api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
            app: AppConfig {
                history_timeout_ms: env::var("HISTORY_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .map_err(|e| format!("Invalid HISTORY_TIMEOUT_MS: {}", e))?,
                thumbnail_max_side: env::var("THUMBNAIL_MAX_SIDE")
                    .unwrap_or_else(|_| "1024".to_string())
                    .parse()
                    .unwrap_or(1024),
                google_id_token: env::var("GOOGLE_ID_TOKEN")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
            },
        })
    }

    /// Reports the first missing value required to run.
    ///
    /// Offline mode keeps sessions in memory and signs in a local user, so only the
    /// model key is needed.
    pub fn validate(&self, offline: bool) -> Result<(), String> {
        if self.gemini.api_key.is_empty() {
            return Err("GEMINI_API_KEY is not set".to_string());
        }
        if self.app.thumbnail_max_side == 0 {
            return Err("THUMBNAIL_MAX_SIDE must be greater than 0".to_string());
        }
        if offline {
            return Ok(());
        }
        if self.firebase.database_url.is_empty() {
            return Err("FIREBASE_DATABASE_URL is not set".to_string());
        }
        if self.firebase.api_key.is_empty() {
            return Err("FIREBASE_API_KEY is not set".to_string());
        }
        Ok(())
    }
}
