use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::policy::{ensure_access, Capability};
use crate::auth::AuthUser;
use crate::models::{ApiError, PresenceResponse};
use crate::state::AppState;

/// Who is connected to the project room right now
pub async fn project_presence(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<(StatusCode, Json<PresenceResponse>), ApiError> {
    ensure_access(state.store.as_ref(), &user, &project_id, Capability::Read).await?;
    let online = state.hub.presence().roster(&project_id).await;
    Ok((StatusCode::OK, Json(PresenceResponse { project_id, online })))
}
