//! services/api/src/web/oauth.rs
//!
//! Browser-facing OAuth endpoints. Both the start and callback legs answer with
//! redirects; failures land on the client's login page with an error code.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use docchat_core::{AuthProvider, PortError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    error::ApiError,
    services::credentials,
    web::state::AppState,
};

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

fn login_error_redirect(state: &AppState, code: &str) -> Response {
    Redirect::to(&format!("{}/login?error={}", state.config.client_url, code)).into_response()
}

fn failure_code(provider: AuthProvider, err: &ApiError) -> String {
    match err {
        ApiError::Port(PortError::EmailNotVerified) => format!("{}_email_not_verified", provider),
        _ => format!("{}_failed", provider),
    }
}

fn start(state: &AppState, provider: AuthProvider) -> Response {
    match state.identity_provider.authorize_url(provider) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            error!("Cannot start {} sign-in: {}", provider, e);
            login_error_redirect(state, &format!("{}_failed", provider))
        }
    }
}

async fn finish(state: &AppState, provider: AuthProvider, params: CallbackParams) -> Response {
    let outcome = async {
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;
        let profile = state.identity_provider.fetch_profile(provider, &code).await?;
        credentials::federated_login(state, &profile).await
    }
    .await;

    match outcome {
        Ok(session) => {
            info!("{} sign-in completed", provider);
            (
                [(header::SET_COOKIE, session.refresh_cookie)],
                Redirect::to(&format!("{}/dashboard", state.config.client_url)),
            )
                .into_response()
        }
        Err(e) => {
            error!("{} OAuth callback failed: {}", provider, e);
            login_error_redirect(state, &failure_code(provider, &e))
        }
    }
}

/// GET /auth/google
pub async fn google_login_handler(State(state): State<Arc<AppState>>) -> Response {
    start(&state, AuthProvider::Google)
}

/// GET /auth/google/callback
pub async fn google_callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    finish(&state, AuthProvider::Google, params).await
}

/// GET /auth/github
pub async fn github_login_handler(State(state): State<Arc<AppState>>) -> Response {
    start(&state, AuthProvider::Github)
}

/// GET /auth/github/callback
pub async fn github_callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    finish(&state, AuthProvider::Github, params).await
}
