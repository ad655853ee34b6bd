use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, error};

use crate::models::{api_error, ApiError, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        service: state.config.service_name.clone(),
    })
}

/// Readiness check endpoint. Ready once the store answers.
pub async fn ready_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    debug!("Readiness check requested");
    if let Err(e) = state.store.ping().await {
        error!("Store not reachable: {}", e);
        return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "Store not reachable"));
    }
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
        service: state.config.service_name.clone(),
    }))
}
