use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::auth::{AuthSession, CredentialProvider};
use crate::domain::{AuthResponse, AuthState, User};
use crate::utils::create_nonce;

/// Authentication status and sign-in/sign-out intents.
///
/// The status starts as [`AuthState::Checking`] and from then on mirrors the
/// session listener.
pub struct AuthService {
    session: AuthSession,
    credentials: Arc<dyn CredentialProvider>,
    state: watch::Sender<AuthState>,
    error_message: watch::Sender<Option<String>>,
    _listener: DropGuard,
}

impl AuthService {
    pub fn new(session: AuthSession, credentials: Arc<dyn CredentialProvider>) -> Self {
        let (state, _) = watch::channel(AuthState::Checking);
        let (error_message, _) = watch::channel(None);

        let cancel = CancellationToken::new();
        tokio::spawn(follow_session(
            session.subscribe(),
            state.clone(),
            cancel.clone(),
        ));

        Self {
            session,
            credentials,
            state,
            error_message,
            _listener: cancel.drop_guard(),
        }
    }

    pub fn state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    pub fn error_message(&self) -> watch::Receiver<Option<String>> {
        self.error_message.subscribe()
    }

    pub fn clear_error(&self) {
        self.error_message.send_replace(None);
    }

    /// Runs the Google sign-in flow with a fresh nonce.
    pub async fn sign_in(&self) -> AuthResponse {
        self.clear_error();
        let nonce = create_nonce();

        let result = async {
            let token = self.credentials.google_id_token(&nonce).await?;
            self.session.sign_in_with_google(&token, &nonce).await
        }
        .await;

        match result {
            Ok(user) => {
                tracing::debug!("Sign-in succeeded for {}", user.uid);
                AuthResponse::Success
            }
            Err(e) => {
                tracing::error!("Sign-in failed: {}", e);
                let message = e.to_string();
                self.error_message.send_replace(Some(message.clone()));
                AuthResponse::Error(message)
            }
        }
    }

    /// Ends the session and forgets the stored credential.
    pub async fn sign_out(&self) -> AuthResponse {
        self.session.sign_out().await;

        match self.credentials.clear_credential_state().await {
            Ok(()) => AuthResponse::Success,
            Err(e) => {
                tracing::error!("Sign-out failed: {}", e);
                let message = e.to_string();
                self.error_message.send_replace(Some(message.clone()));
                AuthResponse::Error(message)
            }
        }
    }
}

async fn follow_session(
    mut users: watch::Receiver<Option<User>>,
    state: watch::Sender<AuthState>,
    cancel: CancellationToken,
) {
    loop {
        let user = users.borrow_and_update().clone();
        state.send_replace(AuthState::from_user(user));

        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = users.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
