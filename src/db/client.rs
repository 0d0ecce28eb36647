use reqwest::{Client, Response, header};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::FirebaseConfig;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("User not authenticated")]
    Unauthorized,

    #[error("Database request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Database returned {status}: {message}")]
    StatusError { status: u16, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Listener cancelled: {0}")]
    Cancelled(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// REST client for a Firebase Realtime Database instance.
///
/// Every call carries the caller's ID token; rules on the server scope access to
/// `users/{uid}`.
#[derive(Clone)]
pub struct RealtimeDbClient {
    http: Client,
    base_url: Arc<str>,
}

impl RealtimeDbClient {
    pub fn new(config: &FirebaseConfig) -> Self {
        tracing::info!("Using realtime database at {}", config.database_url);
        Self {
            http: Client::new(),
            base_url: Arc::from(config.database_url.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    /// Writes `value` at `path`, replacing whatever was there.
    pub async fn set(&self, path: &str, id_token: &str, value: &Value) -> Result<(), DbError> {
        tracing::debug!("PUT {}", path);
        let response = self
            .http
            .put(self.url(path))
            .query(&[("auth", id_token), ("print", "silent")])
            .json(value)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Appends `value` under a server-assigned push id and returns that id.
    pub async fn push(&self, path: &str, id_token: &str, value: &Value) -> Result<String, DbError> {
        tracing::debug!("POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .query(&[("auth", id_token)])
            .json(value)
            .send()
            .await?;

        let body: PushResponse = check(response).await?.json().await?;
        Ok(body.name)
    }

    pub async fn remove(&self, path: &str, id_token: &str) -> Result<(), DbError> {
        tracing::debug!("DELETE {}", path);
        let response = self
            .http
            .delete(self.url(path))
            .query(&[("auth", id_token), ("print", "silent")])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Opens a streaming listener on `path`. The body is a `text/event-stream`.
    pub async fn listen(&self, path: &str, id_token: &str) -> Result<Response, DbError> {
        tracing::debug!("LISTEN {}", path);
        let response = self
            .http
            .get(self.url(path))
            .query(&[("auth", id_token)])
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        check(response).await
    }
}

async fn check(response: Response) -> Result<Response, DbError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(DbError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);

    Err(DbError::StatusError {
        status: status.as_u16(),
        message,
    })
}
