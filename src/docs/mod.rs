use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Store is reachable", body = HealthResponse),
        (status = 503, description = "Store is not reachable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Projects of the caller
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    responses(
        (status = 200, description = "Owned and shared projects, most recently modified first", body = ProjectListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn list_projects_doc() {}

/// Create a project
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    request_body = ProjectCreateRequest,
    responses(
        (status = 201, description = "Created project, seeded with a README.md", body = ProjectRow),
        (status = 400, description = "Missing name", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn create_project_doc() {}

/// Project with its files and collaborators
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project detail", body = ProjectDetailResponse),
        (status = 404, description = "Project not found or insufficient permissions", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn get_project_doc() {}

/// Update a project
#[utoipa::path(
    put,
    path = "/api/v1/projects/{project_id}",
    params(("project_id" = String, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses(
        (status = 200, description = "Updated project", body = ProjectRow),
        (status = 400, description = "Empty name", body = ErrorResponse),
        (status = 404, description = "Project not found or insufficient permissions", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn update_project_doc() {}

/// Delete a project (owner only)
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{project_id}",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project deleted", body = ProjectDeleteResponse),
        (status = 404, description = "Project not found or insufficient permissions", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn delete_project_doc() {}

/// Create a project file
#[utoipa::path(
    post,
    path = "/api/v1/projects/{project_id}/files",
    params(("project_id" = String, Path, description = "Project id")),
    request_body = FileCreateRequest,
    responses(
        (status = 201, description = "Created file", body = ProjectFileRow),
        (status = 404, description = "Project not found or insufficient permissions", body = ErrorResponse),
        (status = 409, description = "A file already exists at the path", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn create_file_doc() {}

/// List project files
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/files",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Files of the project", body = FileListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Project not found or insufficient permissions", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn list_files_doc() {}

/// Create or replace a project file
#[utoipa::path(
    put,
    path = "/api/v1/projects/{project_id}/files",
    params(("project_id" = String, Path, description = "Project id")),
    request_body = FileUpsertRequest,
    responses(
        (status = 200, description = "Stored file", body = ProjectFileRow),
        (status = 400, description = "Invalid path", body = ErrorResponse),
        (status = 404, description = "Project not found or insufficient permissions", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn upsert_file_doc() {}

/// Delete a project file
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{project_id}/files",
    params(("project_id" = String, Path, description = "Project id")),
    request_body = FileDeleteRequest,
    responses(
        (status = 200, description = "File deleted", body = FileDeleteResponse),
        (status = 404, description = "File or project not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn delete_file_doc() {}

/// Chat history of a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/chat",
    params(("project_id" = String, Path, description = "Project id"), ChatHistoryQuery),
    responses(
        (status = 200, description = "Messages, oldest first", body = ChatHistoryResponse),
        (status = 404, description = "Project not found or insufficient permissions", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn chat_history_doc() {}

/// Users currently connected to a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/presence",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Presence roster", body = PresenceResponse),
        (status = 404, description = "Project not found or insufficient permissions", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn presence_doc() {}

/// Explain code
#[utoipa::path(
    post,
    path = "/api/v1/ai/explain",
    request_body = AssistRequest,
    responses(
        (status = 200, description = "Explanation", body = AssistResponse),
        (status = 503, description = "Assistance not configured", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn explain_doc() {}

/// Refactor code
#[utoipa::path(
    post,
    path = "/api/v1/ai/refactor",
    request_body = AssistRequest,
    responses(
        (status = 200, description = "Refactored code", body = AssistResponse),
        (status = 503, description = "Assistance not configured", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn refactor_doc() {}

/// Complete code
#[utoipa::path(
    post,
    path = "/api/v1/ai/complete",
    request_body = AssistRequest,
    responses(
        (status = 200, description = "Completion candidates", body = CompletionResponse),
        (status = 503, description = "Assistance not configured", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn complete_doc() {}

/// Explain, refactor, debug, optimize or generate code
#[utoipa::path(
    post,
    path = "/api/v1/ai/suggest",
    request_body = SuggestRequest,
    responses(
        (status = 200, description = "Suggestion", body = AssistResponse),
        (status = 503, description = "Assistance not configured", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn suggest_doc() {}

/// Server diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Connection counters and host load", body = DiagnosticsResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        list_projects_doc,
        create_project_doc,
        get_project_doc,
        update_project_doc,
        delete_project_doc,
        list_files_doc,
        create_file_doc,
        upsert_file_doc,
        delete_file_doc,
        chat_history_doc,
        presence_doc,
        explain_doc,
        refactor_doc,
        complete_doc,
        suggest_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            DiagnosticsResponse,
            ProjectRow,
            ProjectCreateRequest,
            ProjectUpdateRequest,
            ProjectListResponse,
            ProjectDetailResponse,
            ProjectDeleteResponse,
            CollaboratorRow,
            Role,
            ProjectFileRow,
            FileCreateRequest,
            FileUpsertRequest,
            FileDeleteRequest,
            FileListResponse,
            FileDeleteResponse,
            ChatMessageKind,
            ChatMessageRow,
            ChatHistoryResponse,
            PresenceEntry,
            PresenceResponse,
            AssistKind,
            AssistRequest,
            SuggestRequest,
            AssistResponse,
            CompletionResponse,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
