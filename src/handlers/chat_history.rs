use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::auth::policy::{ensure_access, Capability};
use crate::auth::AuthUser;
use crate::models::{api_error, ApiError, ChatHistoryQuery, ChatHistoryResponse};
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

/// Most recent chat messages of a project, oldest first
pub async fn chat_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<ChatHistoryQuery>,
) -> Result<(StatusCode, Json<ChatHistoryResponse>), ApiError> {
    ensure_access(state.store.as_ref(), &user, &project_id, Capability::Read).await?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    match state.store.list_chat_messages(&project_id, limit).await {
        Ok(messages) => Ok((StatusCode::OK, Json(ChatHistoryResponse { messages }))),
        Err(e) => {
            error!("Failed to load chat of project {}: {}", project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load messages"))
        }
    }
}
