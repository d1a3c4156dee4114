//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use docchat_core::PortError;
use std::sync::Arc;
use tracing::warn;

use crate::{error::ApiError, services::tokens::TokenError, web::state::AppState};

/// Middleware that validates the `Authorization: Bearer` access token.
///
/// If valid, loads the account and inserts its `Identity` into request
/// extensions. Expired tokens are reported as `TokenExpired` so the client can
/// refresh; every other failure is a plain 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("No token provided or malformed header".to_string())
        })?;

    let user_id = state.tokens.verify_access_token(token).map_err(|e| match e {
        TokenError::Expired => ApiError::TokenExpired,
        TokenError::Invalid => ApiError::Unauthorized("Invalid token".to_string()),
    })?;

    let user = state.db.get_user_by_id(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => {
            warn!("Access token for unknown user {}", user_id);
            ApiError::Unauthorized("User not found".to_string())
        }
        other => other.into(),
    })?;

    req.extensions_mut().insert(user.identity());
    Ok(next.run(req).await)
}
