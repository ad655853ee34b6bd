use axum::http::{HeaderMap, StatusCode};
use tracing::{error, warn};

use crate::auth::AuthUser;
use crate::models::{api_error, ApiError};
use crate::services::auth_service::{authenticate, get_auth_token, AuthError};
use crate::state::AppState;

/// Admit or refuse a caller before any session exists.
///
/// Used for the WebSocket handshake and by the REST middleware. Bad or
/// missing credentials give 401; a missing secret or an unreachable store
/// give 500 so that callers do not mistake our failure for theirs.
pub async fn admit(headers: &HeaderMap, query_token: Option<&str>, state: &AppState) -> Result<AuthUser, ApiError> {
    let result = match get_auth_token(headers, query_token) {
        Ok(token) => authenticate(&token, state.config.jwt_secret.as_deref(), state.store.as_ref()).await,
        Err(e) => Err(e),
    };

    result.map_err(|e| refusal(&e))
}

fn refusal(err: &AuthError) -> ApiError {
    if err.is_server_side() {
        error!("Authentication unavailable: {}", err);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Authentication unavailable")
    } else {
        warn!("Authentication refused: {}", err);
        api_error(StatusCode::UNAUTHORIZED, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MemoryStore;
    use crate::services::auth_service::test_tokens::{token_for, SECRET};
    use crate::ws::hub::test_support::seeded_store;
    use axum::http::header;
    use std::sync::Arc;

    async fn state(secret: Option<&str>) -> AppState {
        let config = Config {
            jwt_secret: secret.map(str::to_string),
            ..Config::default()
        };
        let store: Arc<MemoryStore> = seeded_store().await;
        AppState::new(config, store)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_valid_token_admits_stored_user() {
        let state = state(Some(SECRET)).await;
        let user = admit(&bearer(&token_for("u2", 60)), None, &state).await.unwrap();
        assert_eq!(user.id, "u2");
        assert_eq!(user.name, "Ugo");

        let via_query = admit(&HeaderMap::new(), Some(&token_for("u1", 60)), &state).await.unwrap();
        assert_eq!(via_query.id, "u1");
    }

    #[tokio::test]
    async fn test_refusals() {
        let state = state(Some(SECRET)).await;
        let missing = admit(&HeaderMap::new(), None, &state).await.unwrap_err();
        assert_eq!(missing.0, StatusCode::UNAUTHORIZED);

        let expired = admit(&bearer(&token_for("u1", -3600)), None, &state).await.unwrap_err();
        assert_eq!(expired.0, StatusCode::UNAUTHORIZED);

        let ghost = admit(&bearer(&token_for("nobody", 60)), None, &state).await.unwrap_err();
        assert_eq!(ghost.0, StatusCode::UNAUTHORIZED);

        let garbage = admit(&bearer("not-a-jwt"), None, &state).await.unwrap_err();
        assert_eq!(garbage.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_secret_fails_closed() {
        let state = state(None).await;
        let err = admit(&bearer(&token_for("u1", 60)), None, &state).await.unwrap_err();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
