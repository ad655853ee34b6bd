use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role a user holds on a project through a collaboration record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    pub fn can_write(self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Editor => "EDITOR",
            Role::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Role::Owner),
            "EDITOR" => Ok(Role::Editor),
            "VIEWER" => Ok(Role::Viewer),
            other => Err(format!("Unknown collaboration role '{}'", other)),
        }
    }
}

/// User row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    /// Account level role, `USER` or `ADMIN`
    pub role: String,
}

impl UserRow {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("ADMIN")
    }
}

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub is_public: bool,
    pub last_modified: DateTime<Utc>,
}

/// Fields of a project about to be created, with the files it starts with
#[derive(Debug, Clone)]
pub struct NewProject {
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    /// (path, content) pairs
    pub files: Vec<(String, String)>,
}

/// Partial update of a project. `None` leaves the column as it is.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// One entry of the collaborator roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorRow {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: Role,
}

/// File row, unique by (project_id, path)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFileRow {
    pub id: Uuid,
    pub project_id: String,
    pub name: String,
    pub path: String,
    pub content: String,
    pub language: String,
    /// Byte length of `content`
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatMessageKind {
    Message,
    System,
}

impl ChatMessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMessageKind::Message => "MESSAGE",
            ChatMessageKind::System => "SYSTEM",
        }
    }
}

impl FromStr for ChatMessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MESSAGE" => Ok(ChatMessageKind::Message),
            "SYSTEM" => Ok(ChatMessageKind::System),
            other => Err(format!("Unknown chat message type '{}'", other)),
        }
    }
}

/// Chat message row. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub project_id: String,
    pub user_id: String,
    pub message: String,
    #[serde(rename = "messageType")]
    pub kind: ChatMessageKind,
    pub created_at: DateTime<Utc>,
}

/// Last known cursor of a user in a file
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRow {
    pub user_id: String,
    pub project_id: String,
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    pub updated_at: DateTime<Utc>,
}
