use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{
    chat_history, complete, create_file, create_project, delete_file, delete_project, diagnostics, explain,
    get_project, health_check, list_files, list_projects, project_presence, ready_check, refactor, suggest,
    update_project, upsert_file,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::state::AppState;

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::<AppState>::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/projects", get(list_projects).post(create_project))
        .route(
            "/v1/projects/:project_id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route(
            "/v1/projects/:project_id/files",
            get(list_files).post(create_file).put(upsert_file).delete(delete_file),
        )
        .route("/v1/projects/:project_id/chat", get(chat_history))
        .route("/v1/projects/:project_id/presence", get(project_presence))
        .route("/v1/ai/explain", post(explain))
        .route("/v1/ai/refactor", post(refactor))
        .route("/v1/ai/complete", post(complete))
        .route("/v1/ai/suggest", post(suggest))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware)); // Applies to all routes added above

    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(protected)
}
