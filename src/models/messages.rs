use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::{ChatMessageKind, CollaboratorRow};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPos {
    pub line: u32,
    pub column: u32,
}

// ---------------------------------------------------------------------------
// client -> server
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub project_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EditMessage {
    pub project_id: String,
    pub file_path: String,
    pub content: String,
    /// Display only. The session identity is authoritative.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CursorMessage {
    pub project_id: String,
    pub file_path: String,
    pub position: CursorPos,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TypingMessage {
    pub project_id: String,
    pub file_path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatPostMessage {
    pub project_id: String,
    #[serde(alias = "message")]
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReceivedMessage {
    JoinRoom(RoomMessage),
    LeaveRoom(RoomMessage),
    EditUpdate(EditMessage),
    CursorUpdate(CursorMessage),
    TypingStart(TypingMessage),
    TypingStop(TypingMessage),
    ChatMessage(ChatPostMessage),
    Ping,
}

// ---------------------------------------------------------------------------
// server -> client
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberMessage {
    pub project_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    pub project_id: String,
    pub collaborators: Vec<CollaboratorRow>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditBroadcast {
    pub project_id: String,
    pub file_path: String,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorBroadcast {
    pub project_id: String,
    pub file_path: String,
    pub position: CursorPos,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingBroadcast {
    pub project_id: String,
    pub file_path: String,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcast {
    pub id: Uuid,
    pub project_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub message: String,
    pub message_type: ChatMessageKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorMessage {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SendMessage {
    MemberJoined(MemberMessage),
    MemberLeft(MemberMessage),
    CollaboratorsSnapshot(SnapshotMessage),
    EditUpdate(EditBroadcast),
    CursorUpdate(CursorBroadcast),
    TypingStart(TypingBroadcast),
    TypingStop(TypingBroadcast),
    ChatMessage(ChatBroadcast),
    Error(ErrorMessage),
    Pong(PongMessage),
}

impl SendMessage {
    pub fn error(message: impl Into<String>) -> Self {
        SendMessage::Error(ErrorMessage { message: message.into() })
    }
}
