use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::auth::AuthUser;
use crate::errors::CollabError;
use crate::models::SendMessage;
use crate::state::AppState;
use crate::ws::gatekeeper::admit;
use crate::ws::{CollabHub, Session};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// WebSocket handler. The credential is checked before the upgrade, so a
/// refused caller never gets a session.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    info!("New WebSocket connection attempt");
    let user = match admit(&headers, query.token.as_deref(), &state).await {
        Ok(user) => user,
        Err(refusal) => return refusal.into_response(),
    };
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, user, hub))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, user: AuthUser, hub: Arc<CollabHub>) {
    let (session, mut outbound) = Session::open(user);
    let conn_id = session.conn_id();
    hub.connect(&session).await;

    let (mut sender, mut receiver) = socket.split();

    // Writer: everything queued for this session, in queue order
    let send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize event for {}: {}", conn_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Reader: one event at a time, each run to completion
    loop {
        let frame = tokio::select! {
            frame = receiver.next() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = session.overflowed() => {
                warn!("Closing {}: client is not keeping up", conn_id);
                break;
            }
        };
        match frame {
            Ok(Message::Text(text)) => hub.dispatch(&session, &text).await,
            Ok(Message::Binary(_)) => {
                warn!("Binary frame from {} rejected", conn_id);
                session.send(SendMessage::error(
                    CollabError::malformed("binary frames are not supported").to_string(),
                ));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error on {}: {}", conn_id, e);
                break;
            }
        }
        if send_task.is_finished() {
            break;
        }
    }

    hub.disconnect(&session).await;
    drop(session);
    if !send_task.is_finished() {
        send_task.abort();
    }
    let _ = send_task.await;
    info!("WebSocket connection {} terminated", conn_id);
}
