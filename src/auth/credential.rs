use async_trait::async_trait;
use std::sync::Mutex;

use super::session::AuthError;

/// Source of Google ID tokens for sign-in.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns an ID token issued for `nonce`.
    async fn google_id_token(&self, nonce: &str) -> Result<String, AuthError>;

    /// Forgets any stored credential so the next sign-in asks again.
    async fn clear_credential_state(&self) -> Result<(), AuthError>;
}

/// Holds a token obtained out of band, from configuration or typed in by the user.
#[derive(Debug, Default)]
pub struct StaticCredentialProvider {
    token: Mutex<Option<String>>,
}

impl StaticCredentialProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.into());
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.lock().map(|t| t.is_some()).unwrap_or(false)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn google_id_token(&self, nonce: &str) -> Result<String, AuthError> {
        tracing::debug!("Requesting Google ID token (nonce {}…)", &nonce[..nonce.len().min(8)]);
        self.token
            .lock()
            .map_err(|_| AuthError::NoCredential("credential store poisoned".to_string()))?
            .clone()
            .ok_or_else(|| AuthError::NoCredential("no Google ID token available".to_string()))
    }

    async fn clear_credential_state(&self) -> Result<(), AuthError> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| AuthError::NoCredential("credential store poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}
