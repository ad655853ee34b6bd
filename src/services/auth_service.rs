use axum::http::{self, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::AuthUser;
use crate::db::{CollabStore, StoreError};

/// Claims carried by a bearer credential. The user id is read from `userId`,
/// falling back to the standard `sub` claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: usize,
}

impl Claims {
    pub fn subject(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .or(self.sub.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("Token carries no user id")]
    MissingSubject,
    #[error("User not found")]
    UnknownUser,
    #[error("No JWT secret configured")]
    NotConfigured,
    #[error("Failed to resolve user: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// True when the failure is ours rather than the caller's credential
    pub fn is_server_side(&self) -> bool {
        matches!(self, AuthError::NotConfigured | AuthError::Store(_))
    }
}

// Get the auth token from request headers, falling back to a query parameter
// since browsers cannot set headers on a WebSocket handshake
pub fn get_auth_token(headers: &HeaderMap, query_token: Option<&str>) -> Result<String, AuthError> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| AuthError::MissingToken)?;
        let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }

    // 2. Try to get token from cookies
    if let Some(cookie_header) = headers.get(http::header::COOKIE).and_then(|v| v.to_str().ok()) {
        for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
            if cookie.name() == "auth_token" && !cookie.value().is_empty() {
                return Ok(cookie.value().to_string());
            }
        }
    }

    // 3. Query string
    match query_token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => Ok(token.to_string()),
        None => Err(AuthError::MissingToken),
    }
}

// Validate a JWT token and return the token data. Signature and expiry are both checked.
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &validation)
}

/// Verify a bearer credential and resolve it to a stored user
pub async fn authenticate(
    token: &str,
    secret: Option<&str>,
    store: &dyn CollabStore,
) -> Result<AuthUser, AuthError> {
    let secret = secret.ok_or(AuthError::NotConfigured)?;
    let token_data = validate_jwt(token, secret)?;
    let user_id = token_data.claims.subject().ok_or(AuthError::MissingSubject)?;
    debug!("JWT token validated for user {}", user_id);

    match store.find_user(user_id).await? {
        Some(user) => Ok(AuthUser::from(user)),
        None => {
            warn!("Token references unknown user {}", user_id);
            Err(AuthError::UnknownUser)
        }
    }
}
