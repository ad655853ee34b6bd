use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{CollabStore, StoreError};
use crate::models::language::{file_name_from_path, language_from_path};
use crate::models::{
    ChatMessageKind, ChatMessageRow, CollaboratorRow, CursorRow, NewProject, ProjectChanges, ProjectFileRow,
    ProjectRow, Role, UserRow,
};

const PROJECT_COLUMNS: &str = "id, name, description, owner_id, is_public, last_modified";
const FILE_COLUMNS: &str = "id, project_id, name, path, content, language, size, created_at, updated_at";

/// Postgres backed store. Schema lives in `sql/schema.sql`.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - Upper bound of pooled connections
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(2) // Keep some connections alive
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    fn log_pool(&self, what: &str) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        debug!(
            "{}. Pool connections: {} idle, {} in use",
            what,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

fn project_from_row(row: &PgRow) -> Result<ProjectRow, StoreError> {
    Ok(ProjectRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        owner_id: row.try_get("owner_id")?,
        is_public: row.try_get("is_public")?,
        last_modified: row.try_get("last_modified")?,
    })
}

fn file_from_row(row: &PgRow) -> Result<ProjectFileRow, StoreError> {
    Ok(ProjectFileRow {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        name: row.try_get("name")?,
        path: row.try_get("path")?,
        content: row.try_get("content")?,
        language: row.try_get("language")?,
        size: row.try_get("size")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn chat_from_row(row: &PgRow) -> Result<ChatMessageRow, StoreError> {
    let kind: String = row.try_get("type")?;
    Ok(ChatMessageRow {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        user_id: row.try_get("user_id")?,
        message: row.try_get("message")?,
        kind: kind.parse::<ChatMessageKind>().map_err(StoreError::Corrupt)?,
        created_at: row.try_get("created_at")?,
    })
}

fn role_from_column(role: String) -> Result<Role, StoreError> {
    role.parse::<Role>().map_err(StoreError::Corrupt)
}

#[async_trait]
impl CollabStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRow>, StoreError> {
        let row = sqlx::query("SELECT id, email, name, avatar, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(UserRow {
                id: row.try_get("id")?,
                email: row.try_get("email")?,
                name: row.try_get("name")?,
                avatar: row.try_get("avatar")?,
                role: row.try_get("role")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_project(&self, project_id: &str) -> Result<Option<ProjectRow>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS))
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(project_from_row).transpose()
    }

    async fn list_projects_for_user(&self, user_id: &str) -> Result<Vec<ProjectRow>, StoreError> {
        let query_sql = format!(
            r#"
            SELECT {}
            FROM projects p
            WHERE p.owner_id = $1
               OR EXISTS (SELECT 1 FROM collaborations c WHERE c.project_id = p.id AND c.user_id = $1)
            ORDER BY p.last_modified DESC
            "#,
            PROJECT_COLUMNS
        );
        let rows = sqlx::query(&query_sql).bind(user_id).fetch_all(&self.pool).await?;

        rows.iter().map(project_from_row).collect()
    }

    async fn create_project(&self, project: &NewProject) -> Result<ProjectRow, StoreError> {
        self.log_pool(&format!("Creating project '{}' for {}", project.name, project.owner_id));
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO projects(id, name, description, owner_id, is_public)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.owner_id)
        .bind(project.is_public)
        .fetch_one(&mut *tx)
        .await?;
        let created = project_from_row(&row)?;

        sqlx::query("INSERT INTO collaborations(project_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(&created.id)
            .bind(&project.owner_id)
            .bind(Role::Owner.as_str())
            .execute(&mut *tx)
            .await?;

        for (path, content) in &project.files {
            sqlx::query(
                r#"
                INSERT INTO project_files(id, project_id, name, path, content, language, size)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&created.id)
            .bind(file_name_from_path(path))
            .bind(path)
            .bind(content)
            .bind(language_from_path(path))
            .bind(content.len() as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update_project(&self, project_id: &str, changes: &ProjectChanges) -> Result<Option<ProjectRow>, StoreError> {
        let query_sql = format!(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_public = COALESCE($4, is_public),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );
        let row = sqlx::query(&query_sql)
            .bind(project_id)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(changes.is_public)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(project_from_row).transpose()
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool, StoreError> {
        // dependent rows go through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_collaboration_role(&self, project_id: &str, user_id: &str) -> Result<Option<Role>, StoreError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM collaborations WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        role.map(role_from_column).transpose()
    }

    async fn list_collaborators(&self, project_id: &str) -> Result<Vec<CollaboratorRow>, StoreError> {
        let query_sql = r#"
            SELECT u.id AS user_id, u.name, u.avatar, c.role
            FROM collaborations c
                JOIN users u ON u.id = c.user_id
            WHERE c.project_id = $1
            ORDER BY c.created_at ASC
        "#;
        let rows = sqlx::query(query_sql).bind(project_id).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<CollaboratorRow, StoreError> {
                Ok(CollaboratorRow {
                    user_id: row.try_get("user_id")?,
                    name: row.try_get("name")?,
                    avatar: row.try_get("avatar")?,
                    role: role_from_column(row.try_get("role")?)?,
                })
            })
            .collect()
    }

    async fn upsert_file(&self, project_id: &str, path: &str, content: &str) -> Result<ProjectFileRow, StoreError> {
        self.log_pool(&format!("Upserting file '{}' in project {}", path, project_id));

        // name and language are only derived when the row is created
        let query_sql = r#"
            INSERT INTO project_files(id, project_id, name, path, content, language, size)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (project_id, path) DO UPDATE
                SET content = EXCLUDED.content,
                    size = EXCLUDED.size,
                    updated_at = NOW()
            RETURNING id, project_id, name, path, content, language, size, created_at, updated_at;
        "#;
        let row = sqlx::query(query_sql)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(file_name_from_path(path))
            .bind(path)
            .bind(content)
            .bind(language_from_path(path))
            .bind(content.len() as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to upsert file '{}' in project {}: {}", path, project_id, e);
                e
            })?;

        file_from_row(&row)
    }

    async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<Option<ProjectFileRow>, StoreError> {
        let query_sql = format!(
            r#"
            INSERT INTO project_files(id, project_id, name, path, content, language, size)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (project_id, path) DO NOTHING
            RETURNING {}
            "#,
            FILE_COLUMNS
        );
        let row = sqlx::query(&query_sql)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(file_name_from_path(path))
            .bind(path)
            .bind(content)
            .bind(language_from_path(path))
            .bind(content.len() as i64)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(file_from_row).transpose()
    }

    async fn list_files(&self, project_id: &str) -> Result<Vec<ProjectFileRow>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM project_files WHERE project_id = $1 ORDER BY path ASC",
            FILE_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(file_from_row).collect()
    }

    async fn delete_file(&self, project_id: &str, path: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM project_files WHERE project_id = $1 AND path = $2")
            .bind(project_id)
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_project(&self, project_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE projects SET last_modified = $1, updated_at = NOW() WHERE id = $2")
            .bind(at)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_chat_message(
        &self,
        project_id: &str,
        user_id: &str,
        message: &str,
        kind: ChatMessageKind,
    ) -> Result<ChatMessageRow, StoreError> {
        let query_sql = r#"
            INSERT INTO chat_messages(id, project_id, user_id, message, type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, user_id, message, type, created_at;
        "#;
        let row = sqlx::query(query_sql)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(user_id)
            .bind(message)
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?;

        chat_from_row(&row)
    }

    async fn list_chat_messages(&self, project_id: &str, limit: u32) -> Result<Vec<ChatMessageRow>, StoreError> {
        let query_sql = r#"
            SELECT * FROM (
                SELECT id, project_id, user_id, message, type, created_at
                FROM chat_messages
                WHERE project_id = $1
                ORDER BY created_at DESC
                LIMIT $2
            ) recent
            ORDER BY created_at ASC
        "#;
        let rows = sqlx::query(query_sql)
            .bind(project_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(chat_from_row).collect()
    }

    async fn upsert_cursor(&self, cursor: &CursorRow) -> Result<(), StoreError> {
        let query_sql = r#"
            INSERT INTO cursor_positions(user_id, project_id, file_path, line_number, column_number, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, project_id, file_path) DO UPDATE
                SET line_number = EXCLUDED.line_number,
                    column_number = EXCLUDED.column_number,
                    updated_at = EXCLUDED.updated_at
        "#;
        sqlx::query(query_sql)
            .bind(&cursor.user_id)
            .bind(&cursor.project_id)
            .bind(&cursor.file_path)
            .bind(cursor.line as i64)
            .bind(cursor.column as i64)
            .bind(cursor.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
