use chrono::Utc;
use tracing::{debug, warn};

use crate::auth::policy::Capability;
use crate::errors::CollabError;
use crate::models::{EditBroadcast, EditMessage, SendMessage};
use crate::services::file_service::{save_file, validate_file_path};
use crate::ws::hub::{broadcast, require_project_id, CollabHub};
use crate::ws::session::Session;

const SAVE_FAILED: &str = "Failed to update code";

/// Handle `edit-update`: store the full file content, then relay it to the
/// other members. Nothing is relayed when the write fails.
pub async fn handle_edit_message(hub: &CollabHub, session: &Session, msg: &EditMessage) -> Result<(), CollabError> {
    let project_id = require_project_id(&msg.project_id)?;
    validate_file_path(&msg.file_path).map_err(CollabError::Malformed)?;
    hub.require_member(session, project_id).await?;

    let user = session.user();
    if let Some(claimed) = msg.user_id.as_deref().filter(|claimed| *claimed != user.id) {
        warn!("Edit from {} claims user {}, ignoring the claim", user.id, claimed);
    }

    hub.authorize(session, project_id, Capability::Write, SAVE_FAILED).await?;

    let file = save_file(hub.store(), project_id, &msg.file_path, &msg.content)
        .await
        .map_err(|e| CollabError::persistence(SAVE_FAILED, e))?;

    let others = hub.others(session, project_id).await;
    let delivered = broadcast(
        &others,
        &SendMessage::EditUpdate(EditBroadcast {
            project_id: project_id.to_string(),
            file_path: file.path,
            content: msg.content.clone(),
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            timestamp: Utc::now(),
        }),
    );
    debug!("Edit of '{}' in {} relayed to {} members", msg.file_path, project_id, delivered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc::Receiver;

    use crate::db::CollabStore;
    use crate::models::SendMessage;
    use crate::ws::hub::test_support::*;
    use crate::ws::hub::CollabHub;
    use crate::ws::session::Session;

    fn edit_frame(path: &str, content: &str, user_id: &str) -> String {
        serde_json::json!({
            "type": "edit-update",
            "projectId": "proj-1",
            "filePath": path,
            "content": content,
            "userId": user_id,
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_edit_is_stored_and_relayed_without_echo() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s2, mut rx2) = connect(&hub, &store, "u2").await;
        let (s4, mut rx4) = connect(&hub, &store, "u4").await;
        for s in [&s1, &s2, &s4] {
            hub.dispatch(s, &join_frame("proj-1")).await;
        }
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx4);

        hub.dispatch(&s2, &edit_frame("main.js", "console.log(1)", "u2")).await;

        assert!(drain(&mut rx2).is_empty(), "author must not get its own edit back");
        for rx in [&mut rx1, &mut rx4] {
            match drain(rx).as_slice() {
                [SendMessage::EditUpdate(edit)] => {
                    assert_eq!(edit.file_path, "main.js");
                    assert_eq!(edit.content, "console.log(1)");
                    assert_eq!(edit.user_id, "u2");
                    assert_eq!(edit.user_name, "Ugo");
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        let file = store.file("proj-1", "main.js").await.unwrap();
        assert_eq!(file.content, "console.log(1)");
        assert_eq!(file.language, "javascript");
    }

    #[tokio::test]
    async fn test_repeated_edits_keep_one_file() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        drain(&mut rx1);

        hub.dispatch(&s1, &edit_frame("x.py", "a", "u1")).await;
        hub.dispatch(&s1, &edit_frame("x.py", "b", "u1")).await;

        assert!(drain(&mut rx1).is_empty());
        assert_eq!(store.file_count("proj-1").await, 1);
        let file = store.file("proj-1", "x.py").await.unwrap();
        assert_eq!(file.content, "b");
        assert_eq!(file.name, "x.py");
        assert_eq!(file.language, "python");
        assert_eq!(file.size, 1);
    }

    #[tokio::test]
    async fn test_viewer_edit_is_rejected() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s4, mut rx4) = connect(&hub, &store, "u4").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s4, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx4);

        hub.dispatch(&s4, &edit_frame("main.js", "hacked", "u4")).await;
        assert_eq!(drain(&mut rx4), vec![SendMessage::error("Access denied to project")]);
        assert!(drain(&mut rx1).is_empty());
        assert!(store.file("proj-1", "main.js").await.is_none());
    }

    #[tokio::test]
    async fn test_edit_requires_joining_first() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s2, mut rx2) = connect(&hub, &store, "u2").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        drain(&mut rx1);

        hub.dispatch(&s2, &edit_frame("main.js", "x", "u2")).await;
        assert!(matches!(drain(&mut rx2).as_slice(), [SendMessage::Error(_)]));
        assert!(drain(&mut rx1).is_empty());
        assert!(store.file("proj-1", "main.js").await.is_none());
    }

    #[tokio::test]
    async fn test_spoofed_user_id_is_ignored() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s2, mut rx2) = connect(&hub, &store, "u2").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s2, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        hub.dispatch(&s2, &edit_frame("a.rs", "fn main() {}", "u1")).await;
        match drain(&mut rx1).as_slice() {
            [SendMessage::EditUpdate(edit)] => assert_eq!(edit.user_id, "u2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_path_is_rejected() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        drain(&mut rx1);

        hub.dispatch(&s1, &edit_frame("../etc/passwd", "x", "u1")).await;
        assert!(matches!(drain(&mut rx1).as_slice(), [SendMessage::Error(_)]));
        assert!(store.list_files("proj-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_access_is_rechecked_after_role_change() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone() as Arc<dyn CollabStore>);
        let (s2, mut rx2) = connect(&hub, &store, "u2").await;
        hub.dispatch(&s2, &join_frame("proj-1")).await;
        drain(&mut rx2);

        store.remove_collaboration("proj-1", "u2").await;
        hub.dispatch(&s2, &edit_frame("main.js", "late", "u2")).await;
        assert_eq!(drain(&mut rx2), vec![SendMessage::error("Access denied to project")]);
        assert!(store.file("proj-1", "main.js").await.is_none());
    }

    async fn joined_pair(hub: &CollabHub, store: &crate::db::MemoryStore) -> (Session, Receiver<SendMessage>, Session, Receiver<SendMessage>) {
        let (s1, mut rx1) = connect(hub, store, "u1").await;
        let (s2, mut rx2) = connect(hub, store, "u2").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s2, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx2);
        (s1, rx1, s2, rx2)
    }

    #[tokio::test]
    async fn test_failed_edit_persist_broadcasts_nothing() {
        let memory = seeded_store().await;
        let hub = CollabHub::new(Arc::new(FailingStore::new(memory.clone(), &[Failure::FileWrites])));
        let (_s1, mut rx1, s2, mut rx2) = joined_pair(&hub, &memory).await;

        hub.dispatch(&s2, &edit_frame("main.js", "lost", "u2")).await;
        assert_eq!(drain(&mut rx2), vec![SendMessage::error("Failed to update code")]);
        assert!(drain(&mut rx1).is_empty());
        assert!(memory.file("proj-1", "main.js").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_project_touch_broadcasts_nothing() {
        let memory = seeded_store().await;
        let hub = CollabHub::new(Arc::new(FailingStore::new(memory.clone(), &[Failure::Touch])));
        let (_s1, mut rx1, s2, mut rx2) = joined_pair(&hub, &memory).await;

        hub.dispatch(&s2, &edit_frame("a.js", "let a = 1;", "u2")).await;
        assert_eq!(drain(&mut rx2), vec![SendMessage::error("Failed to update code")]);
        assert!(drain(&mut rx1).is_empty());
    }
}
