use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

use crate::auth::policy::{ensure_access, Capability};
use crate::auth::AuthUser;
use crate::models::{
    api_error, ApiError, FileCreateRequest, FileDeleteRequest, FileDeleteResponse, FileListResponse,
    FileUpsertRequest, ProjectFileRow,
};
use crate::services::file_service::{save_file, validate_file_path};
use crate::state::AppState;

/// List the files of a project
pub async fn list_files(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<(StatusCode, Json<FileListResponse>), ApiError> {
    ensure_access(state.store.as_ref(), &user, &project_id, Capability::Read).await?;
    match state.store.list_files(&project_id).await {
        Ok(files) => Ok((StatusCode::OK, Json(FileListResponse { files }))),
        Err(e) => {
            error!("Failed to list files of project {}: {}", project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list files"))
        }
    }
}

/// Create or replace a file. Connected editors are not notified; live edits
/// go through the socket.
pub async fn upsert_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<FileUpsertRequest>,
) -> Result<(StatusCode, Json<ProjectFileRow>), ApiError> {
    validate_file_path(&payload.path).map_err(|msg| api_error(StatusCode::BAD_REQUEST, msg))?;
    ensure_access(state.store.as_ref(), &user, &project_id, Capability::Write).await?;

    match save_file(state.store.as_ref(), &project_id, &payload.path, &payload.content).await {
        Ok(file) => {
            info!("User {} saved '{}' in project {}", user.id, file.path, project_id);
            Ok((StatusCode::OK, Json(file)))
        }
        Err(e) => {
            error!("Failed to save '{}' in project {}: {}", payload.path, project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file"))
        }
    }
}

/// Create a new file. An existing file at the path is left alone and the
/// call answers 409.
pub async fn create_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<FileCreateRequest>,
) -> Result<(StatusCode, Json<ProjectFileRow>), ApiError> {
    validate_file_path(&payload.path).map_err(|msg| api_error(StatusCode::BAD_REQUEST, msg))?;
    ensure_access(state.store.as_ref(), &user, &project_id, Capability::Write).await?;

    match state.store.create_file(&project_id, &payload.path, &payload.content).await {
        Ok(Some(file)) => {
            info!("User {} created '{}' in project {}", user.id, file.path, project_id);
            Ok((StatusCode::CREATED, Json(file)))
        }
        Ok(None) => Err(api_error(
            StatusCode::CONFLICT,
            format!("File '{}' already exists", payload.path),
        )),
        Err(e) => {
            error!("Failed to create '{}' in project {}: {}", payload.path, project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create file"))
        }
    }
}

/// Delete a file by path
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<FileDeleteRequest>,
) -> Result<(StatusCode, Json<FileDeleteResponse>), ApiError> {
    validate_file_path(&payload.path).map_err(|msg| api_error(StatusCode::BAD_REQUEST, msg))?;
    ensure_access(state.store.as_ref(), &user, &project_id, Capability::Write).await?;

    match state.store.delete_file(&project_id, &payload.path).await {
        Ok(true) => {
            info!("User {} deleted '{}' in project {}", user.id, payload.path, project_id);
            Ok((StatusCode::OK, Json(FileDeleteResponse { success: true })))
        }
        Ok(false) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("File '{}' not found", payload.path),
        )),
        Err(e) => {
            error!("Failed to delete '{}' in project {}: {}", payload.path, project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete file"))
        }
    }
}
