use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, watch};

use crate::domain::User;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User not authenticated")]
    NotSignedIn,

    #[error("No credential available: {0}")]
    NoCredential(String),

    #[error("Identity request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("Invalid identity response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenGrant {
    /// Tokens are refreshed a minute before they lapse.
    pub fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(60) <= now
    }
}

#[derive(Debug, Clone)]
pub struct SignedInUser {
    pub user: User,
    pub tokens: TokenGrant,
}

/// Hosted authentication: exchanges an identity-provider credential for a session.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// `nonce` is the hashed value the credential was requested with.
    async fn sign_in_with_google(
        &self,
        google_id_token: &str,
        nonce: &str,
    ) -> Result<SignedInUser, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;
}

struct AuthInner {
    backend: Arc<dyn IdentityBackend>,
    user: watch::Sender<Option<User>>,
    tokens: Mutex<Option<TokenGrant>>,
}

/// The signed-in identity and its listener.
///
/// Everything that needs "who is signed in" reads it from here; the auth
/// coordinator derives its status from [`AuthSession::subscribe`].
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthInner>,
}

impl AuthSession {
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            inner: Arc::new(AuthInner {
                backend,
                user,
                tokens: Mutex::new(None),
            }),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.user.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.inner.user.subscribe()
    }

    pub async fn sign_in_with_google(
        &self,
        google_id_token: &str,
        nonce: &str,
    ) -> Result<User, AuthError> {
        let signed_in = self
            .inner
            .backend
            .sign_in_with_google(google_id_token, nonce)
            .await?;

        *self.inner.tokens.lock().await = Some(signed_in.tokens);
        tracing::info!("Signed in as {}", signed_in.user.uid);
        self.inner.user.send_replace(Some(signed_in.user.clone()));

        Ok(signed_in.user)
    }

    /// Returns a valid ID token, refreshing it first when it is about to expire.
    pub async fn id_token(&self) -> Result<String, AuthError> {
        let mut tokens = self.inner.tokens.lock().await;
        let grant = tokens.as_mut().ok_or(AuthError::NotSignedIn)?;

        if grant.is_expiring(Utc::now()) {
            tracing::debug!("Refreshing ID token");
            *grant = self.inner.backend.refresh(&grant.refresh_token).await?;
        }

        Ok(grant.id_token.clone())
    }

    pub async fn sign_out(&self) {
        *self.inner.tokens.lock().await = None;
        if self.inner.user.send_replace(None).is_some() {
            tracing::info!("Signed out");
        }
    }
}
