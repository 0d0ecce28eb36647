use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::domain::User;

use super::session::{AuthError, IdentityBackend, SignedInUser, TokenGrant};

/// Signs every credential in as one fixed local user. Used when running offline.
#[derive(Debug, Clone)]
pub struct LocalIdentityBackend {
    user: User,
}

impl LocalIdentityBackend {
    pub fn new(uid: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            user: User {
                uid: uid.into(),
                display_name,
                email: None,
            },
        }
    }

    fn grant() -> TokenGrant {
        TokenGrant {
            id_token: "local".to_string(),
            refresh_token: "local".to_string(),
            expires_at: Utc::now() + Duration::days(365),
        }
    }
}

impl Default for LocalIdentityBackend {
    fn default() -> Self {
        Self::new("local", Some("Local user".to_string()))
    }
}

#[async_trait]
impl IdentityBackend for LocalIdentityBackend {
    async fn sign_in_with_google(
        &self,
        google_id_token: &str,
        _nonce: &str,
    ) -> Result<SignedInUser, AuthError> {
        if google_id_token.trim().is_empty() {
            return Err(AuthError::NoCredential("empty ID token".to_string()));
        }

        Ok(SignedInUser {
            user: self.user.clone(),
            tokens: Self::grant(),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, AuthError> {
        Ok(Self::grant())
    }
}
