use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::{AuthError, AuthSession};
use crate::db::{
    ChatSessionRow, DbError, DbEvent, MessageRow, RealtimeDbClient, SseDecoder, decode_messages,
    decode_sessions, paths, tree,
};
use crate::domain::{ChatSession, Message, User};

use super::chat_store::ChatStore;
use super::subscription::Subscription;

/// Chat store backed by the hosted realtime database.
#[derive(Clone)]
pub struct FireChatRepository {
    client: RealtimeDbClient,
    auth: AuthSession,
}

impl FireChatRepository {
    pub fn new(client: RealtimeDbClient, auth: AuthSession) -> Self {
        Self { client, auth }
    }

    fn current_user(&self) -> Result<User, DbError> {
        self.auth.current_user().ok_or(DbError::Unauthorized)
    }

    async fn id_token(&self) -> Result<String, DbError> {
        id_token(&self.auth).await
    }

    fn listen<T, F>(&self, path: String, decode: F) -> Subscription<T>
    where
        T: Send + 'static,
        F: Fn(&Value) -> T + Send + Sync + 'static,
    {
        let client = self.client.clone();
        let auth = self.auth.clone();

        Subscription::spawn(move |sender| async move {
            match run_listener(&client, &auth, &path, &sender, decode).await {
                Ok(()) => tracing::debug!("Listener on {} closed", path),
                Err(e) => tracing::warn!("Listener on {} cancelled: {}", path, e),
            }
        })
    }
}

async fn id_token(auth: &AuthSession) -> Result<String, DbError> {
    auth.id_token().await.map_err(|e| {
        if !matches!(e, AuthError::NotSignedIn) {
            tracing::warn!("Could not obtain ID token: {}", e);
        }
        DbError::Unauthorized
    })
}

/// Streams `path` until the connection ends, the receiver goes away, or the server
/// cancels. A revoked token reconnects with a fresh one while the user is still
/// signed in.
async fn run_listener<T, F>(
    client: &RealtimeDbClient,
    auth: &AuthSession,
    path: &str,
    sender: &mpsc::Sender<T>,
    decode: F,
) -> Result<(), DbError>
where
    F: Fn(&Value) -> T,
{
    loop {
        let token = id_token(auth).await?;
        let response = client.listen(path, &token).await?;
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut snapshot = Value::Null;
        let mut revoked = false;

        'stream: while let Some(chunk) = body.next().await {
            for event in decoder.feed(&chunk?) {
                match DbEvent::parse(&event)? {
                    Some(DbEvent::Put { path, data }) => tree::apply_put(&mut snapshot, &path, data),
                    Some(DbEvent::Patch { path, data }) => {
                        tree::apply_patch(&mut snapshot, &path, data)
                    }
                    Some(DbEvent::KeepAlive) | None => continue,
                    Some(DbEvent::Cancel(reason)) => return Err(DbError::Cancelled(reason)),
                    Some(DbEvent::AuthRevoked) => {
                        revoked = true;
                        break 'stream;
                    }
                }

                if sender.send(decode(&snapshot)).await.is_err() {
                    return Ok(());
                }
            }
        }

        if !revoked || auth.current_user().is_none() {
            return Ok(());
        }
        tracing::info!("Token revoked for listener on {}, reconnecting", path);
    }
}

#[async_trait]
impl ChatStore for FireChatRepository {
    fn observe_sessions(&self) -> Result<Subscription<Vec<ChatSession>>, DbError> {
        let user = self.current_user()?;
        Ok(self.listen(paths::chats(&user.uid), decode_sessions))
    }

    fn observe_messages(&self, chat_id: &str) -> Result<Subscription<Vec<Message>>, DbError> {
        let user = self.current_user()?;
        Ok(self.listen(paths::messages(&user.uid, chat_id), decode_messages))
    }

    async fn create_session(&self, title: &str) -> Result<String, DbError> {
        let user = self.current_user()?;
        let token = self.id_token().await?;
        let chat_id = Uuid::new_v4().to_string();

        let row = ChatSessionRow::new(&chat_id, title)
            .to_value()
            .map_err(DbError::SerializationError)?;
        self.client
            .set(&paths::chat(&user.uid, &chat_id), &token, &row)
            .await?;

        Ok(chat_id)
    }

    async fn add_message(&self, chat_id: &str, message: &Message) -> Result<String, DbError> {
        let user = self.current_user()?;
        let token = self.id_token().await?;

        let row = MessageRow::from_message(message)
            .to_value()
            .map_err(DbError::SerializationError)?;
        self.client
            .push(&paths::messages(&user.uid, chat_id), &token, &row)
            .await
    }

    async fn update_title(&self, chat_id: &str, title: &str) -> Result<(), DbError> {
        let user = self.current_user()?;
        let token = self.id_token().await?;

        self.client
            .set(
                &paths::chat_title(&user.uid, chat_id),
                &token,
                &Value::String(title.to_string()),
            )
            .await
    }

    async fn delete_session(&self, chat_id: &str) -> Result<(), DbError> {
        let user = self.current_user()?;
        let token = self.id_token().await?;

        self.client.remove(&paths::chat(&user.uid, chat_id), &token).await
    }
}
