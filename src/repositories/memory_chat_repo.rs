use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::AuthSession;
use crate::db::{ChatSessionRow, DbError, MessageRow, decode_messages, decode_sessions, paths, tree};
use crate::domain::{ChatSession, Message, User};
use crate::utils::PushIdGenerator;

use super::chat_store::ChatStore;
use super::subscription::Subscription;

struct MemoryState {
    tree: watch::Sender<Value>,
    push_ids: Mutex<PushIdGenerator>,
    writes: AtomicUsize,
}

/// Chat store that keeps the database tree in process.
///
/// Uses the same key paths, row encoding and decoders as the hosted store, so
/// snapshots look exactly like the ones a remote listener would produce. Nothing
/// survives the process.
#[derive(Clone)]
pub struct MemoryChatRepository {
    auth: AuthSession,
    state: Arc<MemoryState>,
}

impl MemoryChatRepository {
    pub fn new(auth: AuthSession) -> Self {
        let (tree, _) = watch::channel(Value::Null);
        Self {
            auth,
            state: Arc::new(MemoryState {
                tree,
                push_ids: Mutex::new(PushIdGenerator::new()),
                writes: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of write operations applied so far.
    pub fn write_count(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    /// The raw value stored at `path`, if any.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        tree::child(&self.state.tree.borrow(), path).cloned()
    }

    fn current_user(&self) -> Result<User, DbError> {
        self.auth.current_user().ok_or(DbError::Unauthorized)
    }

    fn write(&self, path: &str, data: Value) {
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        self.state
            .tree
            .send_modify(|root| tree::apply_put(root, path, data));
    }

    fn next_push_id(&self) -> Result<String, DbError> {
        let mut generator = self
            .state
            .push_ids
            .lock()
            .map_err(|_| DbError::InvalidData("push id generator poisoned".to_string()))?;
        Ok(generator.generate(chrono::Utc::now().timestamp_millis()))
    }

    fn listen<T, F>(&self, path: String, decode: F) -> Subscription<T>
    where
        T: PartialEq + Clone + Send + Sync + 'static,
        F: Fn(&Value) -> T + Send + Sync + 'static,
    {
        let mut changes = self.state.tree.subscribe();

        Subscription::spawn(move |sender| async move {
            let mut last: Option<T> = None;
            loop {
                let snapshot = {
                    let root = changes.borrow_and_update();
                    decode(tree::child(&root, &path).unwrap_or(&Value::Null))
                };

                if last.as_ref() != Some(&snapshot) {
                    last = Some(snapshot.clone());
                    if sender.send(snapshot).await.is_err() {
                        return;
                    }
                }

                if changes.changed().await.is_err() {
                    return;
                }
            }
        })
    }
}

#[async_trait]
impl ChatStore for MemoryChatRepository {
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
        let chat_id = Uuid::new_v4().to_string();

        let row = ChatSessionRow::new(&chat_id, title)
            .to_value()
            .map_err(DbError::SerializationError)?;
        self.write(&paths::chat(&user.uid, &chat_id), row);

        Ok(chat_id)
    }

    async fn add_message(&self, chat_id: &str, message: &Message) -> Result<String, DbError> {
        let user = self.current_user()?;
        let push_id = self.next_push_id()?;

        let row = MessageRow::from_message(message)
            .to_value()
            .map_err(DbError::SerializationError)?;
        self.write(&paths::message(&user.uid, chat_id, &push_id), row);

        Ok(push_id)
    }

    async fn update_title(&self, chat_id: &str, title: &str) -> Result<(), DbError> {
        let user = self.current_user()?;
        self.write(
            &paths::chat_title(&user.uid, chat_id),
            Value::String(title.to_string()),
        );
        Ok(())
    }

    async fn delete_session(&self, chat_id: &str) -> Result<(), DbError> {
        let user = self.current_user()?;
        self.write(&paths::chat(&user.uid, chat_id), Value::Null);
        Ok(())
    }
}
