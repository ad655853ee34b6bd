use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CollabStore, StoreError};
use crate::models::language::{file_name_from_path, language_from_path};
use crate::models::{
    ChatMessageKind, ChatMessageRow, CollaboratorRow, CursorRow, NewProject, ProjectChanges, ProjectFileRow,
    ProjectRow, Role, UserRow,
};

pub const DEV_USER_ID: &str = "dev-user";

#[derive(Default)]
struct MemoryData {
    users: HashMap<String, UserRow>,
    projects: HashMap<String, ProjectRow>,
    // (project_id, user_id) -> role, plus insertion order for the roster
    collaborations: Vec<(String, String, Role)>,
    files: HashMap<(String, String), ProjectFileRow>,
    chat: Vec<ChatMessageRow>,
    cursors: HashMap<(String, String, String), CursorRow>,
}

/// Process local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding one admin user (`dev-user`) and a project it owns, so a
    /// development server without a database can be used right away.
    pub async fn with_development_seed() -> Self {
        let store = Self::new();
        store
            .insert_user(UserRow {
                id: DEV_USER_ID.to_string(),
                email: "dev@localhost".to_string(),
                name: "Developer".to_string(),
                avatar: None,
                role: "ADMIN".to_string(),
            })
            .await;
        let seeded = store
            .create_project(&NewProject {
                owner_id: DEV_USER_ID.to_string(),
                name: "playground".to_string(),
                description: Some("Scratch project for local development".to_string()),
                is_public: false,
                files: vec![("README.md".to_string(), "# playground\n".to_string())],
            })
            .await;
        if let Ok(project) = seeded {
            debug!("Seeded development project {}", project.id);
        }
        store
    }

    pub async fn insert_user(&self, user: UserRow) {
        self.data.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn insert_project(&self, project: ProjectRow) {
        self.data.write().await.projects.insert(project.id.clone(), project);
    }

    /// Add or change a collaboration role
    pub async fn set_collaboration(&self, project_id: &str, user_id: &str, role: Role) {
        let mut data = self.data.write().await;
        let existing = data
            .collaborations
            .iter()
            .position(|(p, u, _)| p == project_id && u == user_id);
        match existing {
            Some(idx) => data.collaborations[idx].2 = role,
            None => data
                .collaborations
                .push((project_id.to_string(), user_id.to_string(), role)),
        }
    }

    pub async fn remove_collaboration(&self, project_id: &str, user_id: &str) {
        self.data
            .write()
            .await
            .collaborations
            .retain(|(p, u, _)| !(p == project_id && u == user_id));
    }

    pub async fn file(&self, project_id: &str, path: &str) -> Option<ProjectFileRow> {
        self.data
            .read()
            .await
            .files
            .get(&(project_id.to_string(), path.to_string()))
            .cloned()
    }

    pub async fn file_count(&self, project_id: &str) -> usize {
        self.data
            .read()
            .await
            .files
            .keys()
            .filter(|(p, _)| p == project_id)
            .count()
    }

    pub async fn cursor(&self, user_id: &str, project_id: &str, file_path: &str) -> Option<CursorRow> {
        self.data
            .read()
            .await
            .cursors
            .get(&(user_id.to_string(), project_id.to_string(), file_path.to_string()))
            .cloned()
    }
}

fn new_file(project_id: &str, path: &str, content: &str, now: DateTime<Utc>) -> ProjectFileRow {
    ProjectFileRow {
        id: Uuid::new_v4(),
        project_id: project_id.to_string(),
        name: file_name_from_path(path).to_string(),
        path: path.to_string(),
        content: content.to_string(),
        language: language_from_path(path).to_string(),
        size: content.len() as i64,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl CollabStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRow>, StoreError> {
        Ok(self.data.read().await.users.get(user_id).cloned())
    }

    async fn find_project(&self, project_id: &str) -> Result<Option<ProjectRow>, StoreError> {
        Ok(self.data.read().await.projects.get(project_id).cloned())
    }

    async fn list_projects_for_user(&self, user_id: &str) -> Result<Vec<ProjectRow>, StoreError> {
        let data = self.data.read().await;
        let mut projects: Vec<ProjectRow> = data
            .projects
            .values()
            .filter(|p| {
                p.owner_id == user_id
                    || data.collaborations.iter().any(|(pid, uid, _)| pid == &p.id && uid == user_id)
            })
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(projects)
    }

    async fn create_project(&self, project: &NewProject) -> Result<ProjectRow, StoreError> {
        let now = Utc::now();
        let row = ProjectRow {
            id: Uuid::new_v4().to_string(),
            name: project.name.clone(),
            description: project.description.clone(),
            owner_id: project.owner_id.clone(),
            is_public: project.is_public,
            last_modified: now,
        };
        let mut data = self.data.write().await;
        data.projects.insert(row.id.clone(), row.clone());
        data.collaborations
            .push((row.id.clone(), project.owner_id.clone(), Role::Owner));
        for (path, content) in &project.files {
            data.files
                .insert((row.id.clone(), path.clone()), new_file(&row.id, path, content, now));
        }
        Ok(row)
    }

    async fn update_project(&self, project_id: &str, changes: &ProjectChanges) -> Result<Option<ProjectRow>, StoreError> {
        let mut data = self.data.write().await;
        let Some(project) = data.projects.get_mut(project_id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            project.name = name.clone();
        }
        if let Some(description) = &changes.description {
            project.description = Some(description.clone());
        }
        if let Some(is_public) = changes.is_public {
            project.is_public = is_public;
        }
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool, StoreError> {
        let mut data = self.data.write().await;
        if data.projects.remove(project_id).is_none() {
            return Ok(false);
        }
        data.collaborations.retain(|(p, _, _)| p != project_id);
        data.files.retain(|(p, _), _| p != project_id);
        data.chat.retain(|m| m.project_id != project_id);
        data.cursors.retain(|(_, p, _), _| p != project_id);
        Ok(true)
    }

    async fn find_collaboration_role(&self, project_id: &str, user_id: &str) -> Result<Option<Role>, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .collaborations
            .iter()
            .find(|(p, u, _)| p == project_id && u == user_id)
            .map(|(_, _, role)| *role))
    }

    async fn list_collaborators(&self, project_id: &str) -> Result<Vec<CollaboratorRow>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .collaborations
            .iter()
            .filter(|(p, _, _)| p == project_id)
            .filter_map(|(_, user_id, role)| {
                data.users.get(user_id).map(|user| CollaboratorRow {
                    user_id: user.id.clone(),
                    name: user.name.clone(),
                    avatar: user.avatar.clone(),
                    role: *role,
                })
            })
            .collect())
    }

    async fn upsert_file(&self, project_id: &str, path: &str, content: &str) -> Result<ProjectFileRow, StoreError> {
        let now = Utc::now();
        let mut data = self.data.write().await;
        let file = data
            .files
            .entry((project_id.to_string(), path.to_string()))
            .and_modify(|file| {
                file.content = content.to_string();
                file.size = content.len() as i64;
                file.updated_at = now;
            })
            .or_insert_with(|| new_file(project_id, path, content, now));
        Ok(file.clone())
    }

    async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<Option<ProjectFileRow>, StoreError> {
        let mut data = self.data.write().await;
        let key = (project_id.to_string(), path.to_string());
        if data.files.contains_key(&key) {
            return Ok(None);
        }
        let file = new_file(project_id, path, content, Utc::now());
        data.files.insert(key, file.clone());
        Ok(Some(file))
    }

    async fn list_files(&self, project_id: &str) -> Result<Vec<ProjectFileRow>, StoreError> {
        let data = self.data.read().await;
        let mut files: Vec<ProjectFileRow> = data
            .files
            .values()
            .filter(|f| f.project_id == project_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn delete_file(&self, project_id: &str, path: &str) -> Result<bool, StoreError> {
        Ok(self
            .data
            .write()
            .await
            .files
            .remove(&(project_id.to_string(), path.to_string()))
            .is_some())
    }

    async fn touch_project(&self, project_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(project) = self.data.write().await.projects.get_mut(project_id) {
            project.last_modified = at;
        }
        Ok(())
    }

    async fn create_chat_message(
        &self,
        project_id: &str,
        user_id: &str,
        message: &str,
        kind: ChatMessageKind,
    ) -> Result<ChatMessageRow, StoreError> {
        let row = ChatMessageRow {
            id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            message: message.to_string(),
            kind,
            created_at: Utc::now(),
        };
        self.data.write().await.chat.push(row.clone());
        Ok(row)
    }

    async fn list_chat_messages(&self, project_id: &str, limit: u32) -> Result<Vec<ChatMessageRow>, StoreError> {
        let data = self.data.read().await;
        let messages: Vec<ChatMessageRow> = data
            .chat
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn upsert_cursor(&self, cursor: &CursorRow) -> Result<(), StoreError> {
        self.data.write().await.cursors.insert(
            (cursor.user_id.clone(), cursor.project_id.clone(), cursor.file_path.clone()),
            cursor.clone(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_creates_then_overwrites() {
        let store = MemoryStore::new();
        let created = store.upsert_file("p1", "src/x.py", "print('hi')").await.unwrap();
        assert_eq!(created.language, "python");
        assert_eq!(created.name, "x.py");
        assert_eq!(created.size, "print('hi')".len() as i64);

        let updated = store.upsert_file("p1", "src/x.py", "é").await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.content, "é");
        // byte length, not char count
        assert_eq!(updated.size, 2);
        assert_eq!(store.file_count("p1").await, 1);
    }

    #[tokio::test]
    async fn test_chat_history_keeps_newest() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .create_chat_message("p1", "u1", &format!("m{}", i), ChatMessageKind::Message)
                .await
                .unwrap();
        }
        store.create_chat_message("p2", "u1", "other", ChatMessageKind::Message).await.unwrap();

        let recent = store.list_chat_messages("p1", 2).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4"]);
    }

    #[tokio::test]
    async fn test_project_lifecycle() {
        let store = MemoryStore::new();
        let project = store
            .create_project(&NewProject {
                owner_id: "u1".into(),
                name: "demo".into(),
                description: None,
                is_public: false,
                files: vec![("README.md".into(), "# demo".into())],
            })
            .await
            .unwrap();
        assert_eq!(store.find_collaboration_role(&project.id, "u1").await.unwrap(), Some(Role::Owner));
        assert_eq!(store.file(&project.id, "README.md").await.unwrap().language, "markdown");

        store.set_collaboration(&project.id, "u2", Role::Viewer).await;
        assert_eq!(store.list_projects_for_user("u2").await.unwrap().len(), 1);
        assert!(store.list_projects_for_user("u3").await.unwrap().is_empty());

        let changes = ProjectChanges {
            is_public: Some(true),
            ..ProjectChanges::default()
        };
        let updated = store.update_project(&project.id, &changes).await.unwrap().unwrap();
        assert!(updated.is_public);
        assert_eq!(updated.name, "demo");

        assert!(store.create_file(&project.id, "README.md", "again").await.unwrap().is_none());
        store.create_chat_message(&project.id, "u1", "hi", ChatMessageKind::Message).await.unwrap();

        assert!(store.delete_project(&project.id).await.unwrap());
        assert!(!store.delete_project(&project.id).await.unwrap());
        assert_eq!(store.file_count(&project.id).await, 0);
        assert_eq!(store.find_collaboration_role(&project.id, "u2").await.unwrap(), None);
        assert!(store.list_chat_messages(&project.id, 10).await.unwrap().is_empty());
        assert!(store.update_project(&project.id, &changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_development_seed_has_an_owner_and_a_project() {
        let store = MemoryStore::with_development_seed().await;
        let user = store.find_user(DEV_USER_ID).await.unwrap().unwrap();
        assert!(user.is_admin());
        let projects = store.list_projects_for_user(DEV_USER_ID).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].owner_id, DEV_USER_ID);
    }

    #[tokio::test]
    async fn test_collaboration_roles_update_in_place() {
        let store = MemoryStore::new();
        store.set_collaboration("p1", "u1", Role::Editor).await;
        store.set_collaboration("p1", "u1", Role::Viewer).await;
        assert_eq!(store.find_collaboration_role("p1", "u1").await.unwrap(), Some(Role::Viewer));
        store.remove_collaboration("p1", "u1").await;
        assert_eq!(store.find_collaboration_role("p1", "u1").await.unwrap(), None);
    }
}
