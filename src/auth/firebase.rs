use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Response, header};
use serde::{Deserialize, Serialize};

use crate::config::FirebaseConfig;
use crate::domain::User;

use super::session::{AuthError, IdentityBackend, SignedInUser, TokenGrant};

const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithIdp";
const REFRESH_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Firebase Authentication over its REST interface.
#[derive(Clone)]
pub struct FirebaseIdentityBackend {
    http: Client,
    api_key: String,
}

impl FirebaseIdentityBackend {
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.api_key.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest {
    post_body: String,
    request_uri: String,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
    display_name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn expires_in(seconds: &str) -> Result<Duration, AuthError> {
    seconds
        .parse::<i64>()
        .map(Duration::seconds)
        .map_err(|e| AuthError::InvalidResponse(format!("Invalid expiresIn '{}': {}", seconds, e)))
}

fn idp_post_body(google_id_token: &str, nonce: &str) -> String {
    format!(
        "id_token={}&providerId=google.com&nonce={}",
        google_id_token, nonce
    )
}

async fn check(response: Response) -> Result<Response, AuthError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .ok()
        .and_then(|w| w.error.message)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    Err(AuthError::Rejected(message))
}

#[async_trait]
impl IdentityBackend for FirebaseIdentityBackend {
    async fn sign_in_with_google(
        &self,
        google_id_token: &str,
        nonce: &str,
    ) -> Result<SignedInUser, AuthError> {
        let request = SignInWithIdpRequest {
            post_body: idp_post_body(google_id_token, nonce),
            request_uri: "http://localhost".to_string(),
            return_secure_token: true,
            return_idp_credential: true,
        };

        let response = self
            .http
            .post(SIGN_IN_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let body: SignInWithIdpResponse = check(response).await?.json().await?;
        let expires_at = Utc::now() + expires_in(&body.expires_in)?;

        Ok(SignedInUser {
            user: User {
                uid: body.local_id,
                display_name: body.display_name,
                email: body.email,
            },
            tokens: TokenGrant {
                id_token: body.id_token,
                refresh_token: body.refresh_token,
                expires_at,
            },
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let response = self
            .http
            .post(REFRESH_URL)
            .query(&[("key", self.api_key.as_str())])
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("grant_type=refresh_token&refresh_token={}", refresh_token))
            .send()
            .await?;

        let body: RefreshResponse = check(response).await?.json().await?;
        let expires_at = Utc::now() + expires_in(&body.expires_in)?;

        Ok(TokenGrant {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at,
        })
    }
}
