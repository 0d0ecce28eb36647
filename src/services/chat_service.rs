use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::AppConfig;
use crate::domain::{ChatSession, Message, MessageContent, MessageRole, next_session_title};
use crate::llm::{GenerativeModel, Turn, build_history, image_turn};
use crate::repositories::{ChatStore, MediaStore, Subscription};
use crate::utils::image_utils::{load_thumbnail_async, read_image_async};

use super::error::ChatError;

const NO_RESPONSE: &str = "No response";
const NO_DESCRIPTION: &str = "No description available";
const DEFAULT_TITLE: &str = "New Chat";

struct ChatInner {
    store: Arc<dyn ChatStore>,
    model: Arc<dyn GenerativeModel>,
    media: Option<Arc<dyn MediaStore>>,
    app_config: AppConfig,
    sessions: watch::Sender<Vec<ChatSession>>,
    selected: watch::Sender<Option<String>>,
    messages: watch::Sender<Vec<Message>>,
    notice: watch::Sender<Option<String>>,
}

/// Chat view state and intents.
///
/// Owns the session list, the selected session and the messages of the selected
/// session, each published through a `watch` channel. Intents run as tasks scoped
/// to this service; dropping it cancels them and closes every store listener.
pub struct ChatService {
    inner: Arc<ChatInner>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ChatStore>,
        model: Arc<dyn GenerativeModel>,
        media: Option<Arc<dyn MediaStore>>,
        app_config: AppConfig,
    ) -> Self {
        let inner = Arc::new(ChatInner {
            store,
            model,
            media,
            app_config,
            sessions: watch::channel(Vec::new()).0,
            selected: watch::channel(None).0,
            messages: watch::channel(Vec::new()).0,
            notice: watch::channel(None).0,
        });

        let service = Self {
            inner,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        };

        service.spawn_listener(ChatInner::follow_sessions);
        service.spawn_listener(ChatInner::follow_selected_messages);
        service
    }

    fn spawn_listener<F, Fut>(&self, listener: F)
    where
        F: FnOnce(Arc<ChatInner>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let task = listener(self.inner.clone());
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = task => {}
            }
        });
    }

    fn spawn_intent<F, Fut>(&self, intent: F)
    where
        F: FnOnce(Arc<ChatInner>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let task = intent(self.inner.clone());
        self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => tracing::debug!("Intent cancelled"),
                _ = task => {}
            }
        });
    }

    pub fn sessions(&self) -> watch::Receiver<Vec<ChatSession>> {
        self.inner.sessions.subscribe()
    }

    pub fn selected(&self) -> watch::Receiver<Option<String>> {
        self.inner.selected.subscribe()
    }

    pub fn messages(&self) -> watch::Receiver<Vec<Message>> {
        self.inner.messages.subscribe()
    }

    pub fn notices(&self) -> watch::Receiver<Option<String>> {
        self.inner.notice.subscribe()
    }

    pub fn clear_notice(&self) {
        self.inner.notice.send_replace(None);
    }

    pub fn current_id(&self) -> Option<String> {
        self.inner.selected.borrow().clone()
    }

    /// Title of the selected session, or a placeholder when nothing is selected.
    pub fn current_title(&self) -> String {
        let selected = self.inner.selected.borrow();
        selected
            .as_deref()
            .and_then(|id| {
                self.inner
                    .sessions
                    .borrow()
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| s.title.clone())
            })
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    pub fn select_session(&self, chat_id: impl Into<String>) {
        let chat_id = chat_id.into();
        tracing::debug!("Setting current chat to: {}", chat_id);
        self.inner.selected.send_replace(Some(chat_id));
    }

    pub fn create_session(&self) {
        self.spawn_intent(|inner| async move {
            let title = next_session_title(inner.sessions.borrow().len());
            match inner.store.create_session(&title).await {
                Ok(chat_id) => {
                    tracing::info!("Created new chat: {}", chat_id);
                    inner.selected.send_replace(Some(chat_id));
                }
                Err(e) => inner.report("Error creating chat", ChatError::from(e)),
            }
        });
    }

    pub fn delete_session(&self, chat_id: impl Into<String>) {
        let chat_id = chat_id.into();
        self.spawn_intent(|inner| async move {
            if let Err(e) = inner.store.delete_session(&chat_id).await {
                inner.report("Error deleting chat", ChatError::from(e));
                return;
            }

            let is_selected = inner.selected.borrow().as_deref() == Some(chat_id.as_str());
            if is_selected {
                let next = inner
                    .sessions
                    .borrow()
                    .iter()
                    .find(|s| s.id != chat_id)
                    .map(|s| s.id.clone());
                inner.selected.send_replace(next);
            }
        });
    }

    pub fn rename_session(&self, chat_id: impl Into<String>, title: impl Into<String>) {
        let chat_id = chat_id.into();
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return;
        }

        self.spawn_intent(|inner| async move {
            if let Err(e) = inner.store.update_title(&chat_id, &title).await {
                inner.report("Error renaming chat", ChatError::from(e));
            }
        });
    }

    /// Sends a text turn to the selected session and appends the model's reply.
    ///
    /// Does nothing when no session is selected or `question` is blank.
    pub fn send_message(&self, question: impl Into<String>) {
        let question = question.into();
        let Some(chat_id) = self.current_id() else {
            tracing::warn!("Cannot send message: no chat selected");
            return;
        };
        if question.trim().is_empty() {
            tracing::warn!("Cannot send message: question is blank");
            return;
        }

        self.spawn_intent(|inner| async move {
            if let Err(e) = inner.try_send_message(&chat_id, &question).await {
                tracing::error!("Error sending message: {}", e);
                inner
                    .append_error(&chat_id, format!("Error: {}", e))
                    .await;
            }
        });
    }

    /// Attaches a local image to the selected session and appends the model's
    /// description of it.
    ///
    /// Does nothing when no session is selected or `path` is blank.
    pub fn send_image(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let Some(chat_id) = self.current_id() else {
            tracing::warn!("Cannot send image: no chat selected");
            return;
        };
        if path.to_string_lossy().trim().is_empty() {
            tracing::warn!("Cannot send image: path is blank");
            return;
        }

        self.spawn_intent(|inner| async move {
            if let Err(e) = inner.try_send_image(&chat_id, path).await {
                tracing::error!("Error sending image: {}", e);
                inner
                    .append_error(&chat_id, format!("Error sending image: {}", e))
                    .await;
            }
        });
    }

    /// Waits until every intent started so far has finished.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancels in-flight intents and closes store listeners.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl Drop for ChatService {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl ChatInner {
    fn report(&self, context: &str, err: ChatError) {
        tracing::error!("{}: {}", context, err);
        self.notice.send_replace(Some(format!("{}: {}", context, err)));
    }

    async fn follow_sessions(self: Arc<Self>) {
        let mut subscription = match self.store.observe_sessions() {
            Ok(subscription) => subscription,
            Err(e) => {
                self.report("Error loading chats", ChatError::from(e));
                return;
            }
        };

        while let Some(sessions) = subscription.next().await {
            self.sessions.send_replace(sessions);
        }
        tracing::debug!("Session listener ended");
    }

    /// Keeps `messages` in step with the selected session, replacing the store
    /// subscription whenever the selection changes.
    async fn follow_selected_messages(self: Arc<Self>) {
        let mut selected = self.selected.subscribe();

        loop {
            let chat_id = selected.borrow_and_update().clone();
            self.messages.send_replace(Vec::new());

            let mut subscription = chat_id.and_then(|id| match self.store.observe_messages(&id) {
                Ok(subscription) => Some(subscription),
                Err(e) => {
                    self.report("Error loading messages", ChatError::from(e));
                    None
                }
            });

            loop {
                tokio::select! {
                    changed = selected.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        break;
                    }
                    snapshot = next_or_pending(&mut subscription) => match snapshot {
                        Some(messages) => {
                            self.messages.send_replace(messages);
                        }
                        None => subscription = None,
                    }
                }
            }
        }
    }

    async fn try_send_message(&self, chat_id: &str, question: &str) -> Result<(), ChatError> {
        self.store
            .add_message(chat_id, &Message::user_text(question))
            .await?;

        let snapshot = self.current_messages(chat_id).await;
        let history = build_history(&snapshot, self.app_config.thumbnail_max_side).await;

        let response = self
            .model
            .send_message(history, Turn::user_text(question))
            .await?;

        let reply = Message::model_text(response.unwrap_or_else(|| NO_RESPONSE.to_string()));
        self.store.add_message(chat_id, &reply).await?;
        Ok(())
    }

    async fn try_send_image(&self, chat_id: &str, path: PathBuf) -> Result<(), ChatError> {
        let path = tokio::fs::canonicalize(path.clone()).await.unwrap_or(path);
        let image = read_image_async(path.clone()).await?;

        let uri = match &self.media {
            Some(media) => media.upload_image(&image).await?,
            None => path.to_string_lossy().into_owned(),
        };

        self.store
            .add_message(
                chat_id,
                &Message::new(MessageContent::image(uri), MessageRole::User),
            )
            .await?;

        let description = self.describe_image(path).await;
        self.store
            .add_message(chat_id, &Message::model_text(description))
            .await?;
        Ok(())
    }

    /// Asks the model to describe an image. Failures become the description text.
    async fn describe_image(&self, path: PathBuf) -> String {
        let thumbnail =
            match load_thumbnail_async(path, self.app_config.thumbnail_max_side).await {
                Ok(thumbnail) => thumbnail,
                Err(e) => {
                    tracing::warn!("Couldn't load image: {}", e);
                    return "Couldn't load image".to_string();
                }
            };

        match self.model.generate(vec![image_turn(thumbnail)]).await {
            Ok(Some(text)) => text,
            Ok(None) => NO_DESCRIPTION.to_string(),
            Err(e) => format!("Error analyzing image: {}", e),
        }
    }

    /// Reads the session's current messages, giving up after the history timeout.
    async fn current_messages(&self, chat_id: &str) -> Vec<Message> {
        let mut subscription = match self.store.observe_messages(chat_id) {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!("Error getting current messages, using empty list: {}", e);
                return Vec::new();
            }
        };

        match tokio::time::timeout(self.app_config.history_timeout(), subscription.next()).await {
            Ok(messages) => messages.unwrap_or_default(),
            Err(_) => {
                tracing::warn!("Timed out reading messages for {}, using empty list", chat_id);
                Vec::new()
            }
        }
    }

    async fn append_error(&self, chat_id: &str, text: String) {
        if let Err(e) = self
            .store
            .add_message(chat_id, &Message::model_text(text))
            .await
        {
            tracing::error!("Error adding error message: {}", e);
        }
    }
}

async fn next_or_pending<T>(subscription: &mut Option<Subscription<T>>) -> Option<T> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
