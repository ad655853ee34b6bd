use tracing::debug;

use crate::auth::policy::Capability;
use crate::errors::CollabError;
use crate::models::{ChatBroadcast, ChatMessageKind, ChatPostMessage, SendMessage};
use crate::ws::hub::{broadcast, require_project_id, CollabHub};
use crate::ws::session::Session;

const SEND_FAILED: &str = "Failed to send message";
const MAX_CHAT_CHARS: usize = 10_000;

/// Handle `chat-message`. The stored row is sent to every member, sender
/// included, so all clients show the same id and timestamp.
pub async fn handle_chat_message(hub: &CollabHub, session: &Session, msg: &ChatPostMessage) -> Result<(), CollabError> {
    let project_id = require_project_id(&msg.project_id)?;
    let text = msg.text.trim();
    if text.is_empty() {
        return Err(CollabError::malformed("message text is empty"));
    }
    if text.chars().count() > MAX_CHAT_CHARS {
        return Err(CollabError::malformed(format!(
            "message is longer than {} characters",
            MAX_CHAT_CHARS
        )));
    }
    hub.require_member(session, project_id).await?;
    hub.authorize(session, project_id, Capability::Read, SEND_FAILED).await?;

    let user = session.user();
    let row = hub
        .store()
        .create_chat_message(project_id, &user.id, text, ChatMessageKind::Message)
        .await
        .map_err(|e| CollabError::persistence(SEND_FAILED, e))?;

    let members = hub.rooms().members(project_id).await;
    let delivered = broadcast(
        &members,
        &SendMessage::ChatMessage(ChatBroadcast {
            id: row.id,
            project_id: row.project_id,
            user_id: row.user_id,
            user_name: user.name.clone(),
            user_avatar: user.avatar.clone(),
            message: row.message,
            message_type: row.kind,
            timestamp: row.created_at,
        }),
    );
    debug!("Chat message {} in {} delivered to {} members", row.id, project_id, delivered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::db::CollabStore;
    use crate::models::*;
    use crate::ws::hub::test_support::*;
    use crate::ws::hub::CollabHub;

    fn chat_frame(text: &str) -> String {
        serde_json::json!({ "type": "chat-message", "projectId": "proj-1", "text": text }).to_string()
    }

    #[tokio::test]
    async fn test_chat_reaches_everyone_including_sender() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s4, mut rx4) = connect(&hub, &store, "u4").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s4, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx4);

        // viewers may chat
        hub.dispatch(&s4, &chat_frame("  hi there ")).await;

        let to_sender = drain(&mut rx4);
        let to_other = drain(&mut rx1);
        assert_eq!(to_sender, to_other);
        match to_sender.as_slice() {
            [SendMessage::ChatMessage(chat)] => {
                assert_eq!(chat.message, "hi there");
                assert_eq!(chat.user_id, "u4");
                assert_eq!(chat.message_type, ChatMessageKind::Message);
                let stored = store.list_chat_messages("proj-1", 10).await.unwrap();
                assert_eq!(stored.len(), 1);
                assert_eq!(stored[0].id, chat.id);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_frame_uses_message_type_field() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        drain(&mut rx1);
        hub.dispatch(&s1, &chat_frame("hello")).await;

        let frame = serde_json::to_value(&drain(&mut rx1)[0]).unwrap();
        assert_eq!(frame["type"], "chat-message");
        assert_eq!(frame["messageType"], "MESSAGE");
        assert_eq!(frame["userName"], "Uma");
    }

    #[tokio::test]
    async fn test_empty_chat_is_rejected() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        drain(&mut rx1);

        hub.dispatch(&s1, &chat_frame("   ")).await;
        assert!(matches!(drain(&mut rx1).as_slice(), [SendMessage::Error(_)]));
        assert!(store.list_chat_messages("proj-1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_broadcasts_nothing() {
        let memory = seeded_store().await;
        let hub = CollabHub::new(Arc::new(FailingStore::read_only(memory.clone())));
        let (s1, mut rx1) = connect(&hub, &memory, "u1").await;
        let (s2, mut rx2) = connect(&hub, &memory, "u2").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s2, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        hub.dispatch(&s1, &chat_frame("lost")).await;
        assert_eq!(drain(&mut rx1), vec![SendMessage::error("Failed to send message")]);
        assert!(drain(&mut rx2).is_empty());

        let edit = serde_json::json!({
            "type": "edit-update",
            "projectId": "proj-1",
            "filePath": "main.js",
            "content": "x",
        });
        hub.dispatch(&s1, &edit.to_string()).await;
        assert_eq!(drain(&mut rx1), vec![SendMessage::error("Failed to update code")]);
        assert!(drain(&mut rx2).is_empty());

        // cursor persistence is best effort: the move is still relayed
        let cursor = serde_json::json!({
            "type": "cursor-update",
            "projectId": "proj-1",
            "filePath": "main.js",
            "position": { "line": 2, "column": 4 },
        });
        hub.dispatch(&s1, &cursor.to_string()).await;
        assert!(drain(&mut rx1).is_empty());
        assert!(matches!(drain(&mut rx2).as_slice(), [SendMessage::CursorUpdate(_)]));
    }

    #[tokio::test]
    async fn test_scenario_two_members_and_a_stranger() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s2, mut rx2) = connect(&hub, &store, "u2").await;
        let (s3, mut rx3) = connect(&hub, &store, "u3").await;

        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s2, &join_frame("proj-1")).await;
        hub.dispatch(&s3, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx2);
        assert!(matches!(drain(&mut rx3).as_slice(), [SendMessage::Error(_)]));

        hub.dispatch(&s2, &chat_frame("ready?")).await;
        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx2).len(), 1);

        hub.dispatch(&s3, &chat_frame("let me in")).await;
        assert!(matches!(drain(&mut rx3).as_slice(), [SendMessage::Error(_)]));
        assert!(drain(&mut rx1).is_empty());
        assert!(drain(&mut rx2).is_empty());
        assert_eq!(store.list_chat_messages("proj-1", 10).await.unwrap().len(), 1);
    }
}
