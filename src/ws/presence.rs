use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::session::{ConnId, Session};
use crate::models::{CursorPos, PresenceEntry};

/// Who is in each project room right now and where their cursor was last seen.
/// Purely in-memory; rebuilt from nothing after a restart.
#[derive(Default)]
pub struct PresenceRegistry {
    rooms: RwLock<HashMap<String, HashMap<ConnId, PresenceEntry>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&self, project_id: &str, session: &Session) {
        let user = session.user();
        let entry = PresenceEntry {
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            user_avatar: user.avatar.clone(),
            file_path: None,
            line: None,
            column: None,
            last_seen: Utc::now(),
        };
        self.rooms
            .write()
            .await
            .entry(project_id.to_string())
            .or_default()
            .insert(session.conn_id(), entry);
    }

    /// Returns false when the connection is not present in the room
    pub async fn move_cursor(&self, project_id: &str, conn_id: ConnId, file_path: &str, position: CursorPos) -> bool {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(project_id).and_then(|room| room.get_mut(&conn_id)) {
            Some(entry) => {
                entry.file_path = Some(file_path.to_string());
                entry.line = Some(position.line);
                entry.column = Some(position.column);
                entry.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    pub async fn exit(&self, project_id: &str, conn_id: ConnId) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(project_id) {
            room.remove(&conn_id);
            if room.is_empty() {
                rooms.remove(project_id);
            }
        }
    }

    /// One entry per user, the most recently active connection winning,
    /// ordered by user name.
    pub async fn roster(&self, project_id: &str) -> Vec<PresenceEntry> {
        let rooms = self.rooms.read().await;
        let mut by_user: HashMap<&str, &PresenceEntry> = HashMap::new();
        if let Some(room) = rooms.get(project_id) {
            for entry in room.values() {
                let newer = by_user
                    .get(entry.user_id.as_str())
                    .map_or(true, |seen| entry.last_seen > seen.last_seen);
                if newer {
                    by_user.insert(entry.user_id.as_str(), entry);
                }
            }
        }
        let mut roster: Vec<PresenceEntry> = by_user.into_values().cloned().collect();
        roster.sort_by(|a, b| a.user_name.cmp(&b.user_name).then_with(|| a.user_id.cmp(&b.user_id)));
        roster
    }

    /// Number of present connections across all rooms
    pub async fn count(&self) -> usize {
        self.rooms.read().await.values().map(HashMap::len).sum()
    }
}
