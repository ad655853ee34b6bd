use chrono::Utc;
use tracing::{debug, warn};

use crate::auth::policy::{self, Capability};
use crate::errors::CollabError;
use crate::models::{CursorBroadcast, CursorMessage, CursorRow, SendMessage, TypingBroadcast, TypingMessage};
use crate::services::file_service::validate_file_path;
use crate::ws::hub::{broadcast, require_project_id, CollabHub};
use crate::ws::session::Session;

/// Handle `cursor-update`.
///
/// The move is relayed to the other members first and persisted afterwards.
/// A failed cursor write is only logged: a stale cursor row is harmless and
/// the next move overwrites it.
pub async fn handle_cursor_message(hub: &CollabHub, session: &Session, msg: &CursorMessage) -> Result<(), CollabError> {
    let project_id = require_project_id(&msg.project_id)?;
    validate_file_path(&msg.file_path).map_err(CollabError::Malformed)?;
    hub.require_member(session, project_id).await?;

    let user = session.user();
    match policy::can_access(hub.store(), &user.id, project_id, Capability::Read).await {
        Ok(true) => {}
        Ok(false) => return Err(CollabError::AccessDenied),
        Err(e) => {
            warn!("Dropping cursor of {} in {}: {}", user.id, project_id, e);
            return Ok(());
        }
    }

    hub.presence()
        .move_cursor(project_id, session.conn_id(), &msg.file_path, msg.position)
        .await;

    let now = Utc::now();
    let others = hub.others(session, project_id).await;
    broadcast(
        &others,
        &SendMessage::CursorUpdate(CursorBroadcast {
            project_id: project_id.to_string(),
            file_path: msg.file_path.clone(),
            position: msg.position,
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            timestamp: now,
        }),
    );

    let row = CursorRow {
        user_id: user.id.clone(),
        project_id: project_id.to_string(),
        file_path: msg.file_path.clone(),
        line: msg.position.line,
        column: msg.position.column,
        updated_at: now,
    };
    if let Err(e) = hub.store().upsert_cursor(&row).await {
        warn!("Could not persist cursor of {} in {}: {}", user.id, project_id, e);
    }
    Ok(())
}

/// Handle `typing-start` and `typing-stop`. Relayed to the other members,
/// never stored.
pub async fn handle_typing_message(
    hub: &CollabHub,
    session: &Session,
    msg: &TypingMessage,
    started: bool,
) -> Result<(), CollabError> {
    let project_id = require_project_id(&msg.project_id)?;
    hub.require_member(session, project_id).await?;

    let user = session.user();
    let typing = TypingBroadcast {
        project_id: project_id.to_string(),
        file_path: msg.file_path.clone(),
        user_id: user.id.clone(),
        user_name: user.name.clone(),
    };
    let event = if started {
        SendMessage::TypingStart(typing)
    } else {
        SendMessage::TypingStop(typing)
    };
    let delivered = broadcast(&hub.others(session, project_id).await, &event);
    debug!("Typing {} from {} relayed to {}", if started { "start" } else { "stop" }, user.id, delivered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::models::{CursorPos, SendMessage};
    use crate::ws::hub::test_support::*;
    use crate::ws::hub::CollabHub;

    #[tokio::test]
    async fn test_cursor_relayed_presence_updated_and_stored() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s4, mut rx4) = connect(&hub, &store, "u4").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s4, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx4);

        let frame = serde_json::json!({
            "type": "cursor-update",
            "projectId": "proj-1",
            "filePath": "src/app.ts",
            "position": { "line": 12, "column": 3 },
            "userId": "someone-else",
        });
        hub.dispatch(&s4, &frame.to_string()).await;

        assert!(drain(&mut rx4).is_empty());
        match drain(&mut rx1).as_slice() {
            [SendMessage::CursorUpdate(cursor)] => {
                assert_eq!(cursor.user_id, "u4");
                assert_eq!(cursor.position, CursorPos { line: 12, column: 3 });
            }
            other => panic!("unexpected {:?}", other),
        }

        let stored = store.cursor("u4", "proj-1", "src/app.ts").await.unwrap();
        assert_eq!((stored.line, stored.column), (12, 3));

        let roster = hub.presence().roster("proj-1").await;
        let uli = roster.iter().find(|p| p.user_id == "u4").unwrap();
        assert_eq!(uli.file_path.as_deref(), Some("src/app.ts"));
        assert_eq!(uli.line, Some(12));
    }

    #[tokio::test]
    async fn test_typing_is_relayed_not_echoed() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s2, mut rx2) = connect(&hub, &store, "u2").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s2, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        hub.dispatch(&s2, r#"{"type":"typing-start","projectId":"proj-1","filePath":"a.rs"}"#).await;
        hub.dispatch(&s2, r#"{"type":"typing-stop","projectId":"proj-1","filePath":"a.rs"}"#).await;
        let seen = drain(&mut rx1);
        assert!(matches!(seen.as_slice(), [SendMessage::TypingStart(_), SendMessage::TypingStop(_)]));
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn test_typing_outside_room_is_rejected() {
        let store = seeded_store().await;
        let hub = CollabHub::new(store.clone());
        let (s1, mut rx1) = connect(&hub, &store, "u1").await;
        let (s2, mut rx2) = connect(&hub, &store, "u2").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        drain(&mut rx1);

        hub.dispatch(&s2, r#"{"type":"typing-start","projectId":"proj-1","filePath":"a.rs"}"#).await;
        assert!(matches!(drain(&mut rx2).as_slice(), [SendMessage::Error(_)]));
        assert!(drain(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn test_cursor_persist_failure_still_relays() {
        let memory = seeded_store().await;
        let hub = CollabHub::new(Arc::new(FailingStore::new(memory.clone(), &[Failure::Cursor])));
        let (s1, mut rx1) = connect(&hub, &memory, "u1").await;
        let (s2, mut rx2) = connect(&hub, &memory, "u2").await;
        hub.dispatch(&s1, &join_frame("proj-1")).await;
        hub.dispatch(&s2, &join_frame("proj-1")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        let frame = serde_json::json!({
            "type": "cursor-update",
            "projectId": "proj-1",
            "filePath": "main.js",
            "position": { "line": 2, "column": 4 },
        });
        hub.dispatch(&s2, &frame.to_string()).await;

        assert!(drain(&mut rx2).is_empty(), "no error for a best-effort cursor write");
        assert!(matches!(drain(&mut rx1).as_slice(), [SendMessage::CursorUpdate(_)]));
        assert!(memory.cursor("u2", "proj-1", "main.js").await.is_none());
        let roster = hub.presence().roster("proj-1").await;
        assert_eq!(roster.iter().find(|p| p.user_id == "u2").unwrap().line, Some(2));
    }
}
