#[cfg(test)]
mod tests {
    use crate::support::{ScriptedModel, chat_service, wait_for};
    use chatbot::{
        auth::{AuthError, AuthSession, LocalIdentityBackend, StaticCredentialProvider},
        db::DbError,
        domain::{AuthResponse, AuthState},
        repositories::{ChatStore, MemoryChatRepository},
        services::AuthService,
    };
    use std::sync::Arc;

    fn setup(token: Option<&str>) -> (AuthSession, AuthService, Arc<StaticCredentialProvider>) {
        let session = AuthSession::new(Arc::new(LocalIdentityBackend::new(
            "user-42",
            Some("Ada".to_string()),
        )));
        let credentials = Arc::new(StaticCredentialProvider::new(token.map(String::from)));
        let service = AuthService::new(session.clone(), credentials.clone());
        (session, service, credentials)
    }

    #[tokio::test]
    async fn test_store_follows_sign_in_and_out() {
        let (session, auth, _) = setup(Some("google-id-token"));
        let repo = MemoryChatRepository::new(session.clone());

        assert!(matches!(
            repo.create_session("Chat 1").await,
            Err(DbError::Unauthorized)
        ));

        assert_eq!(auth.sign_in().await, AuthResponse::Success);
        let mut states = auth.state();
        let state = wait_for(&mut states, |s| matches!(s, AuthState::SignedIn(_))).await;
        assert_eq!(state.user().unwrap().label(), "Ada");

        let chat_id = repo.create_session("Chat 1").await.unwrap();
        assert!(repo.value_at(&format!("users/user-42/chats/{}", chat_id)).is_some());

        assert_eq!(auth.sign_out().await, AuthResponse::Success);
        wait_for(&mut states, |s| *s == AuthState::SignedOut).await;

        assert!(matches!(session.id_token().await, Err(AuthError::NotSignedIn)));
        assert!(matches!(repo.observe_sessions(), Err(DbError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_user_signed_out() {
        let (session, auth, credentials) = setup(Some("  "));

        let response = auth.sign_in().await;

        assert!(matches!(response, AuthResponse::Error(_)));
        assert!(session.current_user().is_none());
        let mut states = auth.state();
        assert_eq!(
            wait_for(&mut states, |s| *s != AuthState::Checking).await,
            AuthState::SignedOut
        );
        assert!(auth.error_message().borrow().is_some());

        credentials.set_token("real-token");
        assert_eq!(auth.sign_in().await, AuthResponse::Success);
        assert!(auth.error_message().borrow().is_none());
    }

    #[tokio::test]
    async fn test_chat_service_after_sign_in_sees_own_sessions() {
        let (session, auth, _) = setup(Some("google-id-token"));
        auth.sign_in().await;

        let repo = MemoryChatRepository::new(session);
        repo.create_session("Existing").await.unwrap();

        let service = chat_service(&repo, ScriptedModel::replying(&[]));
        let mut sessions = service.sessions();
        let listed = wait_for(&mut sessions, |s| !s.is_empty()).await;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Existing");
        assert!(service.notices().borrow().is_none());
    }
}
