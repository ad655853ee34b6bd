use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::session::{ConnId, Session};

/// Result of a join attempt
#[derive(Debug)]
pub enum JoinOutcome {
    /// Newly added. Holds the members that were already in the room.
    Joined { others: Vec<Session> },
    AlreadyJoined,
    /// The connection was torn down while the join was being authorized
    UnknownSession,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoomStats {
    pub connections: usize,
    pub rooms: usize,
    pub memberships: usize,
}

#[derive(Default)]
struct Membership {
    sessions: HashMap<ConnId, Session>,
    // project id -> connections in the room
    rooms: HashMap<String, HashSet<ConnId>>,
    // connection -> project ids it joined
    joined: HashMap<ConnId, HashSet<String>>,
}

impl Membership {
    fn sessions_for(&self, conns: &HashSet<ConnId>) -> Vec<Session> {
        conns.iter().filter_map(|c| self.sessions.get(c).cloned()).collect()
    }

    // Removes conn from the room. Returns the remaining members when it was a member.
    fn remove(&mut self, conn_id: ConnId, project_id: &str) -> Option<Vec<Session>> {
        let was_joined = self
            .joined
            .get_mut(&conn_id)
            .map(|rooms| rooms.remove(project_id))
            .unwrap_or(false);
        if !was_joined {
            return None;
        }

        let remaining = match self.rooms.get_mut(project_id) {
            Some(members) => {
                members.remove(&conn_id);
                if members.is_empty() {
                    self.rooms.remove(project_id);
                    debug!("Room {} is empty, dropping it", project_id);
                    HashSet::new()
                } else {
                    members.clone()
                }
            }
            None => HashSet::new(),
        };
        Some(self.sessions_for(&remaining))
    }
}

/// Live room membership for the whole process.
///
/// Owned by the hub and injected where needed; only `register`, `join`,
/// `leave` and `disconnect` mutate it. A connection is in room X's member set
/// exactly when X is in the connection's joined set. Rooms exist only while
/// they have members.
#[derive(Default)]
pub struct RoomRegistry {
    inner: RwLock<Membership>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn register(&self, session: &Session) {
        let mut m = self.inner.write().await;
        m.joined.entry(session.conn_id()).or_default();
        m.sessions.insert(session.conn_id(), session.clone());
    }

    pub(crate) async fn join(&self, conn_id: ConnId, project_id: &str) -> JoinOutcome {
        let mut m = self.inner.write().await;
        if !m.sessions.contains_key(&conn_id) {
            return JoinOutcome::UnknownSession;
        }

        let newly_joined = m
            .joined
            .entry(conn_id)
            .or_default()
            .insert(project_id.to_string());
        if !newly_joined {
            return JoinOutcome::AlreadyJoined;
        }

        let members = m.rooms.entry(project_id.to_string()).or_default();
        let others_ids: HashSet<ConnId> = members.iter().copied().collect();
        members.insert(conn_id);
        info!("Connection {} joined room {} ({} members)", conn_id, project_id, others_ids.len() + 1);

        JoinOutcome::Joined { others: m.sessions_for(&others_ids) }
    }

    /// Leaving a room the connection is not in changes nothing and returns None.
    pub(crate) async fn leave(&self, conn_id: ConnId, project_id: &str) -> Option<Vec<Session>> {
        let mut m = self.inner.write().await;
        let remaining = m.remove(conn_id, project_id);
        if remaining.is_some() {
            info!("Connection {} left room {}", conn_id, project_id);
        }
        remaining
    }

    /// Leave every joined room and forget the connection. Returns, per room
    /// left, the members that remain.
    pub(crate) async fn disconnect(&self, conn_id: ConnId) -> Vec<(String, Vec<Session>)> {
        let mut m = self.inner.write().await;
        let rooms: Vec<String> = m
            .joined
            .get(&conn_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default();

        let mut left = Vec::with_capacity(rooms.len());
        for project_id in rooms {
            if let Some(remaining) = m.remove(conn_id, &project_id) {
                left.push((project_id, remaining));
            }
        }
        m.joined.remove(&conn_id);
        m.sessions.remove(&conn_id);
        left
    }

    pub async fn is_member(&self, conn_id: ConnId, project_id: &str) -> bool {
        self.inner
            .read()
            .await
            .rooms
            .get(project_id)
            .is_some_and(|members| members.contains(&conn_id))
    }

    pub async fn members(&self, project_id: &str) -> Vec<Session> {
        let m = self.inner.read().await;
        match m.rooms.get(project_id) {
            Some(members) => m.sessions_for(members),
            None => Vec::new(),
        }
    }

    pub async fn joined_rooms(&self, conn_id: ConnId) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .inner
            .read()
            .await
            .joined
            .get(&conn_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub async fn stats(&self) -> RoomStats {
        let m = self.inner.read().await;
        RoomStats {
            connections: m.sessions.len(),
            rooms: m.rooms.len(),
            memberships: m.rooms.values().map(HashSet::len).sum(),
        }
    }

    /// Both directions of the membership relation agree and no room is empty
    #[cfg(test)]
    pub(crate) async fn is_consistent(&self) -> bool {
        let m = self.inner.read().await;
        let forward = m.rooms.iter().all(|(room, members)| {
            !members.is_empty()
                && members
                    .iter()
                    .all(|c| m.joined.get(c).is_some_and(|r| r.contains(room)))
        });
        let backward = m.joined.iter().all(|(c, rooms)| {
            rooms
                .iter()
                .all(|room| m.rooms.get(room).is_some_and(|members| members.contains(c)))
        });
        forward && backward
    }
}
