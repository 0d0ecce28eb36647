use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthSession;
use crate::utils::LocalImage;

const STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0/b";
const IMAGE_FOLDER: &str = "chat_images";

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("User not authenticated")]
    Unauthorized,

    #[error("Upload request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Storage returned {status}: {message}")]
    StatusError { status: u16, message: String },

    #[error("Storage response did not include a download token")]
    MissingDownloadToken,
}

/// Upload target for image attachments. Returns a URL other devices can load.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload_image(&self, image: &LocalImage) -> Result<String, MediaError>;
}

/// Firebase Storage over its REST interface.
#[derive(Clone)]
pub struct FirebaseStorageRepository {
    http: Client,
    bucket: String,
    auth: AuthSession,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    download_tokens: Option<String>,
}

impl FirebaseStorageRepository {
    pub fn new(bucket: impl Into<String>, auth: AuthSession) -> Self {
        Self {
            http: Client::new(),
            bucket: bucket.into(),
            auth,
        }
    }

    fn download_url(&self, object_name: &str, token: &str) -> String {
        format!(
            "{}/{}/o/{}?alt=media&token={}",
            STORAGE_BASE_URL,
            self.bucket,
            object_name.replace('/', "%2F"),
            token
        )
    }
}

#[async_trait]
impl MediaStore for FirebaseStorageRepository {
    async fn upload_image(&self, image: &LocalImage) -> Result<String, MediaError> {
        let id_token = self
            .auth
            .id_token()
            .await
            .map_err(|_| MediaError::Unauthorized)?;
        let object_name = format!("{}/{}", IMAGE_FOLDER, Uuid::new_v4());

        tracing::debug!(
            "Uploading {} ({} bytes) as {}",
            image.file_name,
            image.bytes.len(),
            object_name
        );

        let response = self
            .http
            .post(format!("{}/{}/o", STORAGE_BASE_URL, self.bucket))
            .query(&[("name", object_name.as_str())])
            .header(header::AUTHORIZATION, format!("Firebase {}", id_token))
            .header(header::CONTENT_TYPE, image.mime_type.as_str())
            .body(image.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::StatusError {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response.json().await?;
        let token = body
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or(MediaError::MissingDownloadToken)?;

        Ok(self.download_url(&body.name, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LocalIdentityBackend;
    use std::sync::Arc;

    #[test]
    fn test_download_url_encodes_object_path() {
        let auth = AuthSession::new(Arc::new(LocalIdentityBackend::default()));
        let repo = FirebaseStorageRepository::new("demo.appspot.com", auth);

        assert_eq!(
            repo.download_url("chat_images/abc", "tok"),
            "https://firebasestorage.googleapis.com/v0/b/demo.appspot.com/o/chat_images%2Fabc?alt=media&token=tok"
        );
    }
}
