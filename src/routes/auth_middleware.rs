use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::models::ApiError;
use crate::state::AppState;
use crate::ws::gatekeeper::admit;

/// Resolve the caller and put its [`AuthUser`](crate::auth::AuthUser) into the
/// request extensions for downstream handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = admit(req.headers(), None, &state).await?;
    debug!("Request {} {} by {}", req.method(), req.uri().path(), user.id);
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
