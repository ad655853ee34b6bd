use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use intellicode_collab::config::Config;
use intellicode_collab::db::{CollabStore, MemoryStore};
use intellicode_collab::models::{ProjectRow, Role, UserRow};
use intellicode_collab::routes::build_router;
use intellicode_collab::services::auth_service::Claims;
use intellicode_collab::AppState;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &str = "roundtrip-secret";

fn token(user_id: &str) -> String {
    let claims = Claims {
        user_id: Some(user_id.to_string()),
        sub: None,
        exp: (Utc::now().timestamp() + 300) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn serve() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    for (id, name) in [("u1", "Uma"), ("u2", "Ugo"), ("u3", "Ute")] {
        store
            .insert_user(UserRow {
                id: id.into(),
                email: format!("{}@example.com", id),
                name: name.into(),
                avatar: None,
                role: "USER".into(),
            })
            .await;
    }
    store
        .insert_project(ProjectRow {
            id: "proj-1".into(),
            name: "demo".into(),
            description: None,
            owner_id: "u1".into(),
            is_public: false,
            last_modified: Utc::now(),
        })
        .await;
    store.set_collaboration("proj-1", "u2", Role::Editor).await;

    let config = Config {
        jwt_secret: Some(SECRET.to_string()),
        ..Config::default()
    };
    let app = build_router(AppState::new(config, store.clone()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{}/ws", addr), store)
}

async fn open(url: &str, user_id: &str) -> Client {
    let (ws, _) = connect_async(format!("{}?token={}", url, token(user_id))).await.unwrap();
    ws
}

async fn send(ws: &mut Client, event: Value) {
    ws.send(Message::text(event.to_string())).await.unwrap();
}

async fn next_event(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn join(ws: &mut Client) -> Value {
    send(ws, json!({"type": "join-room", "projectId": "proj-1"})).await;
    next_event(ws).await
}

#[tokio::test]
async fn test_collaboration_round_trip() {
    let (url, store) = serve().await;

    let mut uma = open(&url, "u1").await;
    let mut ugo = open(&url, "u2").await;

    let snapshot = join(&mut uma).await;
    assert_eq!(snapshot["type"], "collaborators-snapshot");

    let snapshot = join(&mut ugo).await;
    assert_eq!(snapshot["type"], "collaborators-snapshot");
    let joined = next_event(&mut uma).await;
    assert_eq!(joined["type"], "member-joined");
    assert_eq!(joined["userId"], "u2");

    send(
        &mut ugo,
        json!({"type": "edit-update", "projectId": "proj-1", "filePath": "x.py", "content": "print(2)", "userId": "u1"}),
    )
    .await;
    let edit = next_event(&mut uma).await;
    assert_eq!(edit["type"], "edit-update");
    assert_eq!(edit["userId"], "u2");
    assert_eq!(edit["content"], "print(2)");
    assert_eq!(store.file("proj-1", "x.py").await.unwrap().content, "print(2)");

    send(&mut uma, json!({"type": "chat-message", "projectId": "proj-1", "text": "looks good"})).await;
    let to_uma = next_event(&mut uma).await;
    let to_ugo = next_event(&mut ugo).await;
    assert_eq!(to_uma, to_ugo);
    assert_eq!(to_uma["messageType"], "MESSAGE");
    assert_eq!(store.list_chat_messages("proj-1", 10).await.unwrap().len(), 1);

    send(&mut ugo, json!({"type": "ping"})).await;
    assert_eq!(next_event(&mut ugo).await["type"], "pong");

    ugo.close(None).await.unwrap();
    let left = next_event(&mut uma).await;
    assert_eq!(left["type"], "member-left");
    assert_eq!(left["userId"], "u2");
}

#[tokio::test]
async fn test_outsiders_are_refused() {
    let (url, _) = serve().await;

    assert!(connect_async(url.clone()).await.is_err());
    assert!(connect_async(format!("{}?token=garbage", url)).await.is_err());

    let mut ute = open(&url, "u3").await;
    let refused = join(&mut ute).await;
    assert_eq!(refused["type"], "error");
    assert_eq!(refused["message"], "Access denied to project");

    ute.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    assert_eq!(next_event(&mut ute).await["type"], "error");
}
