use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::error;

use crate::auth::AuthUser;
use crate::models::{
    api_error, ApiError, AssistKind, AssistRequest, AssistResponse, CompletionResponse, SuggestRequest,
};
use crate::services::assist_service::AssistService;
use crate::state::AppState;

fn service(state: &AppState) -> Result<Arc<AssistService>, ApiError> {
    state
        .assist
        .clone()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "Code assistance is not configured"))
}

fn validate(code: &str, language: &str) -> Result<(), ApiError> {
    if code.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Code is required"));
    }
    if language.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Language is required"));
    }
    Ok(())
}

async fn run(
    state: &AppState,
    user: &AuthUser,
    kind: AssistKind,
    req: &AssistRequest,
) -> Result<(StatusCode, Json<AssistResponse>), ApiError> {
    validate(&req.code, &req.language)?;
    let service = service(state)?;
    match service.assist(kind, &req.code, &req.language, req.context.as_deref()).await {
        Ok(res) => Ok((StatusCode::OK, Json(res))),
        Err(e) => {
            error!("Assistance '{}' for {} failed: {}", kind.as_str(), user.id, e);
            Err(api_error(StatusCode::BAD_GATEWAY, "Failed to generate a response"))
        }
    }
}

/// Explain a piece of code
pub async fn explain(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AssistRequest>,
) -> Result<(StatusCode, Json<AssistResponse>), ApiError> {
    run(&state, &user, AssistKind::Explain, &req).await
}

/// Refactor a piece of code
pub async fn refactor(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AssistRequest>,
) -> Result<(StatusCode, Json<AssistResponse>), ApiError> {
    run(&state, &user, AssistKind::Refactor, &req).await
}

/// One of explain, refactor, debug, optimize or generate
pub async fn suggest(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SuggestRequest>,
) -> Result<(StatusCode, Json<AssistResponse>), ApiError> {
    if req.kind == AssistKind::Complete {
        return Err(api_error(StatusCode::BAD_REQUEST, "Use /ai/complete for completions"));
    }
    let inner = AssistRequest {
        code: req.code,
        language: req.language,
        context: req.context,
    };
    run(&state, &user, req.kind, &inner).await
}

/// Completion candidates for the code so far
pub async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AssistRequest>,
) -> Result<(StatusCode, Json<CompletionResponse>), ApiError> {
    validate(&req.code, &req.language)?;
    let service = service(&state)?;
    match service.complete(&req.code, &req.language, req.context.as_deref()).await {
        Ok(res) => Ok((StatusCode::OK, Json(res))),
        Err(e) => {
            error!("Completion for {} failed: {}", user.id, e);
            Err(api_error(StatusCode::BAD_GATEWAY, "Failed to generate completions"))
        }
    }
}
