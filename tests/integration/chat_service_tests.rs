#[cfg(test)]
mod tests {
    use crate::support::{
        ScriptedModel, StalledHistoryStore, chat_service, signed_in_session, test_config,
        wait_for,
    };
    use chatbot::{
        auth::{AuthSession, LocalIdentityBackend},
        domain::{Message, MessageContent, MessageRole},
        llm::{DESCRIBE_IMAGE_PROMPT, Part, Turn},
        repositories::{ChatStore, MemoryChatRepository},
        services::ChatService,
    };
    use image::{Rgb, RgbImage};
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup(model: Arc<ScriptedModel>) -> (MemoryChatRepository, ChatService) {
        let repo = MemoryChatRepository::new(signed_in_session().await);
        let service = chat_service(&repo, model);
        (repo, service)
    }

    /// Creates a session through the service and waits until it is selected.
    async fn new_selected_session(service: &ChatService) -> String {
        let mut selected = service.selected();
        let before = selected.borrow().clone();
        service.create_session();
        service.settle().await;
        wait_for(&mut selected, |s| s.is_some() && *s != before)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_message_round_trip() {
        let model = ScriptedModel::replying(&["Hi there"]);
        let (_repo, service) = setup(model.clone()).await;
        new_selected_session(&service).await;

        service.send_message("Hello");
        service.settle().await;

        let mut messages = service.messages();
        let thread = wait_for(&mut messages, |m| m.len() == 2).await;
        assert_eq!(thread[0].content, MessageContent::text("Hello"));
        assert_eq!(thread[0].role, MessageRole::User);
        assert_eq!(thread[1].content, MessageContent::text("Hi there"));
        assert_eq!(thread[1].role, MessageRole::Model);

        // The just-written user turn is the prompt, not history
        assert_eq!(model.calls(), vec![vec![Turn::user_text("Hello")]]);
    }

    #[tokio::test]
    async fn test_follow_up_carries_history() {
        let model = ScriptedModel::replying(&["r1", "r2"]);
        let (_repo, service) = setup(model.clone()).await;
        new_selected_session(&service).await;

        service.send_message("one");
        service.settle().await;
        service.send_message("two");
        service.settle().await;

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            vec![
                Turn::user_text("one"),
                Turn::text(MessageRole::Model, "r1"),
                Turn::user_text("two"),
            ]
        );

        let mut messages = service.messages();
        let thread = wait_for(&mut messages, |m| m.len() == 4).await;
        assert_eq!(thread[3].content, MessageContent::text("r2"));
    }

    #[tokio::test]
    async fn test_missing_reply_renders_placeholder() {
        let model = ScriptedModel::new(vec![Ok(None)]);
        let (_repo, service) = setup(model).await;
        new_selected_session(&service).await;

        service.send_message("anything?");
        service.settle().await;

        let mut messages = service.messages();
        let thread = wait_for(&mut messages, |m| m.len() == 2).await;
        assert_eq!(thread[1].content, MessageContent::text("No response"));
    }

    #[tokio::test]
    async fn test_blank_or_unselected_send_is_noop() {
        let model = ScriptedModel::replying(&[]);
        let (repo, service) = setup(model.clone()).await;

        service.send_message("nobody is listening");
        service.settle().await;
        assert_eq!(repo.write_count(), 0);

        new_selected_session(&service).await;
        let writes = repo.write_count();

        service.send_message("   ");
        service.send_message("");
        service.settle().await;

        assert_eq!(repo.write_count(), writes);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_history_read_times_out_to_empty() {
        let repo = MemoryChatRepository::new(signed_in_session().await);
        let id = repo.create_session("Chat 1").await.unwrap();
        repo.add_message(&id, &Message::user_text("earlier")).await.unwrap();

        let model = ScriptedModel::replying(&["still here"]);
        let config = chatbot::config::AppConfig {
            history_timeout_ms: 50,
            ..test_config()
        };
        let service = ChatService::new(
            Arc::new(StalledHistoryStore(repo.clone())),
            model.clone(),
            None,
            config,
        );
        service.select_session(id.clone());

        service.send_message("hi");
        tokio::time::timeout(Duration::from_secs(2), service.settle())
            .await
            .unwrap();

        assert_eq!(model.calls(), vec![vec![Turn::user_text("hi")]]);
        let stored = repo.observe_messages(&id).unwrap().next().await.unwrap();
        let texts: Vec<_> = stored.iter().filter_map(|m| m.content.as_text()).collect();
        assert_eq!(texts, vec!["earlier", "hi", "still here"]);
    }

    #[tokio::test]
    async fn test_blank_image_path_is_noop() {
        let model = ScriptedModel::replying(&[]);
        let (repo, service) = setup(model.clone()).await;
        new_selected_session(&service).await;
        let writes = repo.write_count();

        service.send_image("");
        service.send_image("   ");
        service.settle().await;

        assert_eq!(repo.write_count(), writes);
        assert!(model.calls().is_empty());
        assert!(service.messages().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_appends_one_error_message() {
        let model =
            ScriptedModel::new(vec![Err("RESOURCE_EXHAUSTED: quota exceeded".to_string())]);
        let (_repo, service) = setup(model).await;
        new_selected_session(&service).await;

        service.send_message("hi");
        service.settle().await;

        let mut messages = service.messages();
        let thread = wait_for(&mut messages, |m| m.len() >= 2).await;
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].content, MessageContent::text("hi"));
        assert_eq!(
            thread[1],
            Message {
                timestamp: thread[1].timestamp,
                ..Message::model_text("Error: RESOURCE_EXHAUSTED: quota exceeded")
            }
        );
    }

    #[tokio::test]
    async fn test_delete_selected_moves_to_first_remaining() {
        let (_repo, service) = setup(ScriptedModel::replying(&[])).await;
        let mut sessions = service.sessions();
        let mut selected = service.selected();

        let first = new_selected_session(&service).await;
        wait_for(&mut sessions, |s| s.len() == 1).await;
        let second = new_selected_session(&service).await;
        let listed = wait_for(&mut sessions, |s| s.len() == 2).await;
        let mut titles: Vec<_> = listed.iter().map(|s| s.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Chat 1", "Chat 2"]);

        // Sessions are listed in key order, so either one may come first
        let remaining = listed[0].id.clone();
        let deleted = listed[1].id.clone();
        assert!([&first, &second].contains(&&deleted));
        service.select_session(deleted.clone());
        wait_for(&mut selected, |s| s.as_deref() == Some(deleted.as_str())).await;

        service.delete_session(deleted);
        service.settle().await;
        assert_eq!(
            wait_for(&mut selected, |s| s.as_deref() == Some(remaining.as_str())).await,
            Some(remaining.clone())
        );

        wait_for(&mut sessions, |s| s.len() == 1).await;
        service.delete_session(remaining);
        service.settle().await;
        assert_eq!(wait_for(&mut selected, |s| s.is_none()).await, None);
        assert!(wait_for(&mut sessions, |s| s.is_empty()).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_other_session_keeps_selection() {
        let (_repo, service) = setup(ScriptedModel::replying(&[])).await;
        let mut sessions = service.sessions();

        let first = new_selected_session(&service).await;
        wait_for(&mut sessions, |s| s.len() == 1).await;
        let second = new_selected_session(&service).await;

        service.delete_session(first);
        service.settle().await;

        wait_for(&mut sessions, |s| s.len() == 1).await;
        assert_eq!(service.current_id(), Some(second));
    }

    #[tokio::test]
    async fn test_rename_trims_and_ignores_blank() {
        let (repo, service) = setup(ScriptedModel::replying(&[])).await;
        let id = new_selected_session(&service).await;

        service.rename_session(id.clone(), "  Weekend trip ");
        service.settle().await;

        let mut sessions = service.sessions();
        wait_for(&mut sessions, |s| s.iter().any(|c| c.title == "Weekend trip")).await;
        assert_eq!(service.current_title(), "Weekend trip");

        let writes = repo.write_count();
        service.rename_session(id, "   ");
        service.settle().await;
        assert_eq!(repo.write_count(), writes);
    }

    #[tokio::test]
    async fn test_messages_are_ordered_by_timestamp() {
        let (repo, service) = setup(ScriptedModel::replying(&[])).await;
        let id = new_selected_session(&service).await;

        for (text, ts) in [("third", 30), ("first", 10), ("second", 20)] {
            repo.add_message(&id, &Message::user_text(text).with_timestamp(ts))
                .await
                .unwrap();
        }

        let mut messages = service.messages();
        let thread = wait_for(&mut messages, |m| m.len() == 3).await;
        let texts: Vec<_> = thread.iter().filter_map(|m| m.content.as_text()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(thread.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_unknown_session_yields_empty_messages() {
        let (repo, service) = setup(ScriptedModel::replying(&[])).await;

        let mut snapshot = repo.observe_messages("no-such-chat").unwrap();
        assert_eq!(snapshot.next().await, Some(Vec::new()));

        service.select_session("no-such-chat");
        let mut selected = service.selected();
        wait_for(&mut selected, |s| s.as_deref() == Some("no-such-chat")).await;
        service.settle().await;
        assert!(service.messages().borrow().is_empty());
        assert_eq!(service.current_title(), "New Chat");
    }

    #[tokio::test]
    async fn test_switching_sessions_replaces_thread() {
        let (repo, service) = setup(ScriptedModel::replying(&[])).await;
        let mut sessions = service.sessions();

        let first = new_selected_session(&service).await;
        wait_for(&mut sessions, |s| s.len() == 1).await;
        repo.add_message(&first, &Message::user_text("in first"))
            .await
            .unwrap();

        let second = new_selected_session(&service).await;
        repo.add_message(&second, &Message::user_text("in second"))
            .await
            .unwrap();

        let mut messages = service.messages();
        let thread = wait_for(&mut messages, |m| {
            m.first().and_then(|msg| msg.content.as_text()) == Some("in second")
        })
        .await;
        assert_eq!(thread.len(), 1);

        service.select_session(first);
        let thread = wait_for(&mut messages, |m| {
            m.first().and_then(|msg| msg.content.as_text()) == Some("in first")
        })
        .await;
        assert_eq!(thread.len(), 1);
    }

    #[tokio::test]
    async fn test_send_image_describes_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        RgbImage::from_pixel(8, 4, Rgb([200, 100, 50])).save(&path).unwrap();

        let model = ScriptedModel::replying(&["A small orange rectangle"]);
        let (_repo, service) = setup(model.clone()).await;
        new_selected_session(&service).await;

        service.send_image(path.clone());
        service.settle().await;

        let mut messages = service.messages();
        let thread = wait_for(&mut messages, |m| m.len() == 2).await;
        let canonical = std::fs::canonicalize(&path).unwrap();
        assert_eq!(
            thread[0].content,
            MessageContent::image(canonical.to_string_lossy())
        );
        assert_eq!(
            thread[1].content,
            MessageContent::text("A small orange rectangle")
        );

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        let parts = &calls[0][0].parts;
        assert!(matches!(&parts[0], Part::InlineData { mime_type, .. } if mime_type == "image/png"));
        assert_eq!(parts[1], Part::Text(DESCRIBE_IMAGE_PROMPT.to_string()));
    }

    #[tokio::test]
    async fn test_send_unreadable_image_appends_error() {
        let model = ScriptedModel::replying(&[]);
        let (_repo, service) = setup(model.clone()).await;
        new_selected_session(&service).await;

        service.send_image("/definitely/not/here.png");
        service.settle().await;

        let mut messages = service.messages();
        let thread = wait_for(&mut messages, |m| !m.is_empty()).await;
        assert_eq!(thread.len(), 1);
        assert!(thread[0].is_model());
        assert!(
            thread[0]
                .content
                .as_text()
                .unwrap()
                .starts_with("Error sending image: ")
        );
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_signed_out_store_publishes_notice() {
        let session = AuthSession::new(Arc::new(LocalIdentityBackend::default()));
        let repo = MemoryChatRepository::new(session);
        let service = chat_service(&repo, ScriptedModel::replying(&[]));

        let mut notices = service.notices();
        let notice = wait_for(&mut notices, |n| n.is_some()).await;
        assert_eq!(
            notice.as_deref(),
            Some("Error loading chats: User not authenticated")
        );

        service.clear_notice();
        assert!(service.notices().borrow().is_none());
    }
}
