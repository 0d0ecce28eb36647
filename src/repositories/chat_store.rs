use async_trait::async_trait;

use crate::db::DbError;
use crate::domain::{ChatSession, Message};

use super::subscription::Subscription;

/// Per-user chat persistence.
///
/// All operations act on the namespace of the signed-in user and fail with
/// [`DbError::Unauthorized`] when nobody is signed in.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Session list snapshots, without messages. Starts with the current list.
    fn observe_sessions(&self) -> Result<Subscription<Vec<ChatSession>>, DbError>;

    /// Message snapshots for one session, ordered by timestamp. A session that does
    /// not exist yields empty snapshots.
    fn observe_messages(&self, chat_id: &str) -> Result<Subscription<Vec<Message>>, DbError>;

    /// Creates an empty session and returns its id.
    async fn create_session(&self, title: &str) -> Result<String, DbError>;

    /// Appends a message and returns its push id.
    async fn add_message(&self, chat_id: &str, message: &Message) -> Result<String, DbError>;

    async fn update_title(&self, chat_id: &str, title: &str) -> Result<(), DbError>;

    async fn delete_session(&self, chat_id: &str) -> Result<(), DbError>;
}
