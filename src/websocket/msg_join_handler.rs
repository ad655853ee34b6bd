use tracing::{info, warn};

use crate::auth::policy::Capability;
use crate::errors::CollabError;
use crate::models::{RoomMessage, SendMessage, SnapshotMessage};
use crate::ws::hub::{broadcast, member_message, require_project_id, CollabHub};
use crate::ws::rooms::JoinOutcome;
use crate::ws::session::Session;

/// Handle `join-room`.
///
/// Read access is checked against the store on every join. Existing members
/// hear `member-joined`; the joiner gets the collaborator list instead of its
/// own join. Joining twice re-sends the list and nothing else.
pub async fn handle_join_message(hub: &CollabHub, session: &Session, msg: &RoomMessage) -> Result<(), CollabError> {
    let project_id = require_project_id(&msg.project_id)?;
    hub.authorize(session, project_id, Capability::Read, "Failed to join project")
        .await?;

    match hub.rooms().join(session.conn_id(), project_id).await {
        JoinOutcome::Joined { others } => {
            hub.presence().enter(project_id, session).await;
            broadcast(&others, &SendMessage::MemberJoined(member_message(project_id, session)));
            info!("User {} joined project {}", session.user().name, project_id);
        }
        JoinOutcome::AlreadyJoined => {}
        JoinOutcome::UnknownSession => {
            warn!("Join from closed connection {} ignored", session.conn_id());
            return Ok(());
        }
    }

    // membership stands even when the snapshot cannot be loaded
    let collaborators = hub
        .store()
        .list_collaborators(project_id)
        .await
        .map_err(|e| CollabError::persistence("Failed to load collaborators", e))?;
    session.send(SendMessage::CollaboratorsSnapshot(SnapshotMessage {
        project_id: project_id.to_string(),
        collaborators,
    }));
    Ok(())
}
