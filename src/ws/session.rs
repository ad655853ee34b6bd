use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::sync::Notify;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::SendMessage;

pub type ConnId = Uuid;

/// Events that may queue for one connection before its writer catches up
pub const OUTBOUND_CAPACITY: usize = 256;

/// One authenticated connection.
///
/// The identity is fixed at admission. Outbound events go through a bounded
/// channel drained by the socket writer, so everything sent to one session
/// arrives in the order it was sent. The joined-room set is kept by the
/// [`RoomRegistry`](super::rooms::RoomRegistry) so that both directions of
/// the membership relation change under one lock.
///
/// When the queue is full, cursor and typing hints are dropped. Any other
/// event that does not fit marks the session as overflowed and the
/// connection is closed, so a slow client reconnects and reloads instead of
/// silently missing an edit or a chat message.
#[derive(Clone, Debug)]
pub struct Session {
    conn_id: ConnId,
    user: Arc<AuthUser>,
    outbound: Sender<SendMessage>,
    overflow: Arc<Notify>,
}

impl Session {
    /// Create a session and the receiving end of its outbound queue
    pub fn open(user: AuthUser) -> (Self, Receiver<SendMessage>) {
        Self::with_capacity(user, OUTBOUND_CAPACITY)
    }

    pub fn with_capacity(user: AuthUser, capacity: usize) -> (Self, Receiver<SendMessage>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let session = Self {
            conn_id: Uuid::new_v4(),
            user: Arc::new(user),
            outbound,
            overflow: Arc::new(Notify::new()),
        };
        (session, rx)
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    /// Queue an event for this connection without waiting. Returns false when
    /// the event was dropped or the writer is gone.
    pub fn send(&self, msg: SendMessage) -> bool {
        match self.outbound.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) if is_hint(&msg) => {
                debug!("Outbound queue of {} full, dropping hint", self.conn_id);
                false
            }
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue of {} full, closing the connection", self.conn_id);
                self.overflow.notify_one();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Resolves once an event other than a hint could not be queued
    pub async fn overflowed(&self) {
        self.overflow.notified().await
    }
}

fn is_hint(msg: &SendMessage) -> bool {
    matches!(
        msg,
        SendMessage::CursorUpdate(_) | SendMessage::TypingStart(_) | SendMessage::TypingStop(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TypingBroadcast;
    use std::time::Duration;

    fn user() -> AuthUser {
        AuthUser {
            id: "u1".into(),
            email: "u1@example.com".into(),
            name: "Uma".into(),
            avatar: None,
            is_admin: false,
        }
    }

    fn typing() -> SendMessage {
        SendMessage::TypingStart(TypingBroadcast {
            project_id: "proj-1".into(),
            file_path: "a.rs".into(),
            user_id: "u2".into(),
            user_name: "Ugo".into(),
        })
    }

    #[tokio::test]
    async fn test_full_queue_drops_hints_and_keeps_the_connection() {
        let (session, mut rx) = Session::with_capacity(user(), 1);
        assert!(session.send(SendMessage::error("first")));
        assert!(!session.send(typing()));

        assert_eq!(rx.try_recv().unwrap(), SendMessage::error("first"));
        assert!(rx.try_recv().is_err());
        let overflowed = tokio::time::timeout(Duration::from_millis(20), session.overflowed()).await;
        assert!(overflowed.is_err(), "a dropped hint must not close the session");

        assert!(session.send(typing()));
    }

    #[tokio::test]
    async fn test_full_queue_overflows_on_other_events() {
        let (session, _rx) = Session::with_capacity(user(), 1);
        assert!(session.send(SendMessage::error("first")));
        assert!(!session.send(SendMessage::error("second")));

        let overflowed = tokio::time::timeout(Duration::from_millis(100), session.overflowed()).await;
        assert!(overflowed.is_ok());
    }

    #[tokio::test]
    async fn test_send_after_writer_gone() {
        let (session, rx) = Session::open(user());
        drop(rx);
        assert!(session.is_closed());
        assert!(!session.send(SendMessage::error("nobody listens")));
    }
}
