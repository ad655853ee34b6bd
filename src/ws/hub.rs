use std::sync::Arc;
use tracing::{error, info, warn};

use super::presence::PresenceRegistry;
use super::rooms::{RoomRegistry, RoomStats};
use super::session::Session;
use crate::auth::policy::{self, Capability};
use crate::db::CollabStore;
use crate::errors::CollabError;
use crate::models::{MemberMessage, ReceivedMessage, SendMessage};
use crate::websocket::{
    msg_chat_handler::handle_chat_message,
    msg_cursor_handler::{handle_cursor_message, handle_typing_message},
    msg_edit_handler::handle_edit_message,
    msg_join_handler::handle_join_message,
    msg_leave_handler::handle_leave_message,
    msg_ping_handler::handle_ping_message,
};

/// Collaboration state for one server process: room membership, presence and
/// the store handle every event handler goes through. Created at startup and
/// shared by all connections.
pub struct CollabHub {
    store: Arc<dyn CollabStore>,
    rooms: RoomRegistry,
    presence: PresenceRegistry,
}

impl CollabHub {
    pub fn new(store: Arc<dyn CollabStore>) -> Self {
        Self {
            store,
            rooms: RoomRegistry::new(),
            presence: PresenceRegistry::new(),
        }
    }

    pub fn store(&self) -> &dyn CollabStore {
        self.store.as_ref()
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub async fn stats(&self) -> (RoomStats, usize) {
        (self.rooms.stats().await, self.presence.count().await)
    }

    /// Make an admitted connection known. No room is joined yet.
    pub async fn connect(&self, session: &Session) {
        self.rooms.register(session).await;
        info!("User connected: {} ({})", session.user().name, session.conn_id());
    }

    /// Decode one text frame and run it. Any failure goes back to this
    /// session only.
    pub async fn dispatch(&self, session: &Session, text: &str) {
        let msg = match serde_json::from_str::<ReceivedMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Malformed event from {}: {}", session.conn_id(), e);
                session.send(SendMessage::error(CollabError::malformed(e.to_string()).to_string()));
                return;
            }
        };
        if let Err(e) = self.handle(session, msg).await {
            self.report(session, &e);
        }
    }

    pub async fn handle(&self, session: &Session, msg: ReceivedMessage) -> Result<(), CollabError> {
        match msg {
            ReceivedMessage::JoinRoom(m) => handle_join_message(self, session, &m).await,
            ReceivedMessage::LeaveRoom(m) => handle_leave_message(self, session, &m).await,
            ReceivedMessage::EditUpdate(m) => handle_edit_message(self, session, &m).await,
            ReceivedMessage::CursorUpdate(m) => handle_cursor_message(self, session, &m).await,
            ReceivedMessage::TypingStart(m) => handle_typing_message(self, session, &m, true).await,
            ReceivedMessage::TypingStop(m) => handle_typing_message(self, session, &m, false).await,
            ReceivedMessage::ChatMessage(m) => handle_chat_message(self, session, &m).await,
            ReceivedMessage::Ping => handle_ping_message(session).await,
        }
    }

    /// Leave every joined room, tell the remaining members, forget the session
    pub async fn disconnect(&self, session: &Session) {
        let left = self.rooms.disconnect(session.conn_id()).await;
        for (project_id, remaining) in left {
            self.presence.exit(&project_id, session.conn_id()).await;
            broadcast(&remaining, &SendMessage::MemberLeft(member_message(&project_id, session)));
        }
        info!("User disconnected: {} ({})", session.user().name, session.conn_id());
    }

    fn report(&self, session: &Session, err: &CollabError) {
        match err {
            CollabError::Persistence { action, source } => {
                error!("{} for {} ({}): {}", action, session.user().name, session.conn_id(), source)
            }
            _ => warn!("Rejected event from {} ({}): {}", session.user().name, session.conn_id(), err),
        }
        session.send(SendMessage::error(err.to_string()));
    }

    pub(crate) async fn require_member(&self, session: &Session, project_id: &str) -> Result<(), CollabError> {
        if self.rooms.is_member(session.conn_id(), project_id).await {
            Ok(())
        } else {
            Err(CollabError::NotJoined(project_id.to_string()))
        }
    }

    /// Fresh access check against the store for the session's own identity
    pub(crate) async fn authorize(
        &self,
        session: &Session,
        project_id: &str,
        capability: Capability,
        action: &'static str,
    ) -> Result<(), CollabError> {
        match policy::can_access(self.store(), &session.user().id, project_id, capability).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CollabError::AccessDenied),
            Err(e) => Err(CollabError::persistence(action, e)),
        }
    }

    /// Members of the room other than this connection
    pub(crate) async fn others(&self, session: &Session, project_id: &str) -> Vec<Session> {
        self.rooms
            .members(project_id)
            .await
            .into_iter()
            .filter(|s| s.conn_id() != session.conn_id())
            .collect()
    }
}

/// Queue the same event for every recipient, in slice order. Recipients whose
/// writer is already gone are skipped.
pub(crate) fn broadcast(recipients: &[Session], msg: &SendMessage) -> usize {
    recipients.iter().filter(|s| s.send(msg.clone())).count()
}

pub(crate) fn member_message(project_id: &str, session: &Session) -> MemberMessage {
    let user = session.user();
    MemberMessage {
        project_id: project_id.to_string(),
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_avatar: user.avatar.clone(),
    }
}

pub(crate) fn require_project_id(project_id: &str) -> Result<&str, CollabError> {
    let project_id = project_id.trim();
    if project_id.is_empty() {
        return Err(CollabError::malformed("projectId is required"));
    }
    Ok(project_id)
}
