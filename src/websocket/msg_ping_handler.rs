use chrono::Utc;
use tracing::debug;

use crate::errors::CollabError;
use crate::models::{PongMessage, SendMessage};
use crate::ws::session::Session;

/// Reply to a keepalive with the server time
pub async fn handle_ping_message(session: &Session) -> Result<(), CollabError> {
    debug!("Ping from {}", session.conn_id());
    session.send(SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() }));
    Ok(())
}
