use async_trait::async_trait;
use chatbot::{
    auth::{AuthSession, LocalIdentityBackend},
    config::AppConfig,
    db::DbError,
    domain::{ChatSession, Message},
    llm::{GenerativeError, GenerativeModel, Turn},
    repositories::{ChatStore, MemoryChatRepository, Subscription},
    services::ChatService,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Model that answers from a script and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Option<String>, String>>>,
    calls: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<Option<String>, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(Some(t.to_string()))).collect())
    }

    pub fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, contents: Vec<Turn>) -> Result<Option<String>, GenerativeError> {
        self.calls.lock().unwrap().push(contents);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(GenerativeError::Api {
                status: 500,
                message,
            }),
            None => Ok(Some("ok".to_string())),
        }
    }
}

/// Memory store whose message listeners never deliver a snapshot.
pub struct StalledHistoryStore(pub MemoryChatRepository);

#[async_trait]
impl ChatStore for StalledHistoryStore {
    fn observe_sessions(&self) -> Result<Subscription<Vec<ChatSession>>, DbError> {
        self.0.observe_sessions()
    }

    fn observe_messages(&self, _chat_id: &str) -> Result<Subscription<Vec<Message>>, DbError> {
        Ok(Subscription::spawn(|sender| async move {
            let _sender = sender;
            std::future::pending::<()>().await
        }))
    }

    async fn create_session(&self, title: &str) -> Result<String, DbError> {
        self.0.create_session(title).await
    }

    async fn add_message(&self, chat_id: &str, message: &Message) -> Result<String, DbError> {
        self.0.add_message(chat_id, message).await
    }

    async fn update_title(&self, chat_id: &str, title: &str) -> Result<(), DbError> {
        self.0.update_title(chat_id, title).await
    }

    async fn delete_session(&self, chat_id: &str) -> Result<(), DbError> {
        self.0.delete_session(chat_id).await
    }
}

pub async fn signed_in_session() -> AuthSession {
    let session = AuthSession::new(Arc::new(LocalIdentityBackend::default()));
    session.sign_in_with_google("test-token", "test-nonce").await.unwrap();
    session
}

pub fn test_config() -> AppConfig {
    AppConfig {
        history_timeout_ms: 1000,
        ..AppConfig::default()
    }
}

pub fn chat_service(repo: &MemoryChatRepository, model: Arc<ScriptedModel>) -> ChatService {
    ChatService::new(Arc::new(repo.clone()), model, None, test_config())
}

/// Waits until the watched value satisfies `done`, failing the test after a few seconds.
pub async fn wait_for<T: Clone>(rx: &mut watch::Receiver<T>, done: impl FnMut(&T) -> bool) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed")
        .clone()
}
