use tracing::info;

use crate::errors::CollabError;
use crate::models::{RoomMessage, SendMessage};
use crate::ws::hub::{broadcast, member_message, require_project_id, CollabHub};
use crate::ws::session::Session;

/// Handle `leave-room`. Leaving a room that was never joined does nothing.
pub async fn handle_leave_message(hub: &CollabHub, session: &Session, msg: &RoomMessage) -> Result<(), CollabError> {
    let project_id = require_project_id(&msg.project_id)?;
    if let Some(remaining) = hub.rooms().leave(session.conn_id(), project_id).await {
        hub.presence().exit(project_id, session.conn_id()).await;
        broadcast(&remaining, &SendMessage::MemberLeft(member_message(project_id, session)));
        info!("User {} left project {}", session.user().name, project_id);
    }
    Ok(())
}
