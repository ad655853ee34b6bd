use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

use crate::auth::policy::{ensure_access, Capability};
use crate::auth::AuthUser;
use crate::db::StoreError;
use crate::models::{
    api_error, ApiError, NewProject, ProjectChanges, ProjectCreateRequest, ProjectDeleteResponse,
    ProjectDetailResponse, ProjectListResponse, ProjectRow, ProjectUpdateRequest,
};
use crate::state::AppState;

const DEFAULT_README_TEXT: &str = "A new project created with IntelliCode Hub";

fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "Project not found or insufficient permissions")
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).map(str::to_string)
}

/// Projects the caller owns or collaborates on, most recently modified first
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ProjectListResponse>), ApiError> {
    match state.store.list_projects_for_user(&user.id).await {
        Ok(projects) => Ok((StatusCode::OK, Json(ProjectListResponse { projects }))),
        Err(e) => {
            error!("Failed to list projects of {}: {}", user.id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch projects"))
        }
    }
}

/// One project with its files (by path) and collaborators
pub async fn get_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<(StatusCode, Json<ProjectDetailResponse>), ApiError> {
    ensure_access(state.store.as_ref(), &user, &project_id, Capability::Read).await?;

    let store = state.store.as_ref();
    let loaded = async {
        let project = store.find_project(&project_id).await?;
        let files = store.list_files(&project_id).await?;
        let collaborators = store.list_collaborators(&project_id).await?;
        Ok::<_, StoreError>(project.map(|project| ProjectDetailResponse {
            project,
            files,
            collaborators,
        }))
    };
    match loaded.await {
        Ok(Some(detail)) => Ok((StatusCode::OK, Json(detail))),
        Ok(None) => Err(not_found()),
        Err(e) => {
            error!("Failed to load project {}: {}", project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch project"))
        }
    }
}

/// Create a project owned by the caller, seeded with a README
pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ProjectCreateRequest>,
) -> Result<(StatusCode, Json<ProjectRow>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Project name is required"));
    }
    let description = trimmed(payload.description.as_deref()).filter(|d| !d.is_empty());
    let readme = format!(
        "# {}\n\n{}",
        name,
        description.as_deref().unwrap_or(DEFAULT_README_TEXT)
    );

    let new_project = NewProject {
        owner_id: user.id.clone(),
        name: name.to_string(),
        description,
        is_public: payload.is_public,
        files: vec![("README.md".to_string(), readme)],
    };
    match state.store.create_project(&new_project).await {
        Ok(project) => {
            info!("New project created: {} ({}) by {}", project.name, project.id, user.email);
            Ok((StatusCode::CREATED, Json(project)))
        }
        Err(e) => {
            error!("Failed to create project for {}: {}", user.id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create project"))
        }
    }
}

/// Rename a project or change its description or visibility. Needs write access.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<ProjectUpdateRequest>,
) -> Result<(StatusCode, Json<ProjectRow>), ApiError> {
    let name = trimmed(payload.name.as_deref());
    if name.as_deref() == Some("") {
        return Err(api_error(StatusCode::BAD_REQUEST, "Project name cannot be empty"));
    }
    ensure_access(state.store.as_ref(), &user, &project_id, Capability::Write).await?;

    let changes = ProjectChanges {
        name,
        description: trimmed(payload.description.as_deref()),
        is_public: payload.is_public,
    };
    match state.store.update_project(&project_id, &changes).await {
        Ok(Some(project)) => {
            info!("User {} updated project {}", user.id, project_id);
            Ok((StatusCode::OK, Json(project)))
        }
        Ok(None) => Err(not_found()),
        Err(e) => {
            error!("Failed to update project {}: {}", project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update project"))
        }
    }
}

/// Delete a project and everything in it. Only its owner may.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<(StatusCode, Json<ProjectDeleteResponse>), ApiError> {
    let project = match state.store.find_project(&project_id).await {
        Ok(Some(project)) if project.owner_id == user.id => project,
        Ok(_) => return Err(not_found()),
        Err(e) => {
            error!("Failed to load project {}: {}", project_id, e);
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete project"));
        }
    };

    match state.store.delete_project(&project_id).await {
        Ok(true) => {
            info!("Project deleted: {} ({}) by {}", project.name, project_id, user.email);
            Ok((StatusCode::OK, Json(ProjectDeleteResponse { success: true })))
        }
        Ok(false) => Err(not_found()),
        Err(e) => {
            error!("Failed to delete project {}: {}", project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete project"))
        }
    }
}
