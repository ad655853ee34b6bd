//! Persisted store used by the collaboration layer.
//!
//! Almost every operation is a single-row lookup or write, so concurrent
//! callers only rely on the backend's atomic single-row create/update.
//! Creating a project writes the project, its owner role and its first files
//! together; deleting one removes everything that hangs off it.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    ChatMessageKind, ChatMessageRow, CollaboratorRow, CursorRow, NewProject, ProjectChanges, ProjectFileRow,
    ProjectRow, Role, UserRow,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait CollabStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRow>, StoreError>;

    async fn find_project(&self, project_id: &str) -> Result<Option<ProjectRow>, StoreError>;

    /// Projects the user owns or collaborates on, most recently modified first
    async fn list_projects_for_user(&self, user_id: &str) -> Result<Vec<ProjectRow>, StoreError>;

    /// Create a project with an `OWNER` role for its owner and its initial files
    async fn create_project(&self, project: &NewProject) -> Result<ProjectRow, StoreError>;

    /// None when the project does not exist
    async fn update_project(&self, project_id: &str, changes: &ProjectChanges) -> Result<Option<ProjectRow>, StoreError>;

    /// Remove the project with its roles, files, chat and cursors. Returns
    /// false when it did not exist.
    async fn delete_project(&self, project_id: &str) -> Result<bool, StoreError>;

    async fn find_collaboration_role(&self, project_id: &str, user_id: &str) -> Result<Option<Role>, StoreError>;

    async fn list_collaborators(&self, project_id: &str) -> Result<Vec<CollaboratorRow>, StoreError>;

    /// Create or replace the file at (project_id, path). Last write wins.
    async fn upsert_file(&self, project_id: &str, path: &str, content: &str) -> Result<ProjectFileRow, StoreError>;

    /// Create a file only when the path is free. None when it is taken.
    async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<Option<ProjectFileRow>, StoreError>;

    async fn list_files(&self, project_id: &str) -> Result<Vec<ProjectFileRow>, StoreError>;

    /// Returns false when no file existed at the path
    async fn delete_file(&self, project_id: &str, path: &str) -> Result<bool, StoreError>;

    async fn touch_project(&self, project_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn create_chat_message(
        &self,
        project_id: &str,
        user_id: &str,
        message: &str,
        kind: ChatMessageKind,
    ) -> Result<ChatMessageRow, StoreError>;

    /// The most recent `limit` messages, oldest first
    async fn list_chat_messages(&self, project_id: &str, limit: u32) -> Result<Vec<ChatMessageRow>, StoreError>;

    async fn upsert_cursor(&self, cursor: &CursorRow) -> Result<(), StoreError>;
}
