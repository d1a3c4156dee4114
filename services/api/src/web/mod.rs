//! services/api/src/web/mod.rs
//!
//! HTTP surface: handlers, the auth middleware and the router that ties them
//! to `AppState`.

pub mod auth;
pub mod middleware;
pub mod oauth;
pub mod rest;
pub mod state;
pub mod user;
pub mod validation;

pub use middleware::require_auth;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Smallest request body the router accepts. Multipart bodies above the limit
/// are cut off before the handler runs; the per-file cap is enforced
/// separately so it can be reported as a 400.
const MIN_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Leaves room above the configured file cap so an oversize upload still
/// reaches the handler and gets the size message.
pub fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_mul(2).max(MIN_BODY_LIMIT_BYTES)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(client_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    match HeaderValue::from_str(client_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("CLIENT_URL '{}' is not a valid origin; CORS disabled", client_url);
            cors
        }
    }
}

/// Builds the complete application router.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/send-reset-otp", post(auth::send_reset_otp_handler))
        .route("/auth/reset-password", post(auth::reset_password_handler))
        .route("/auth/google", get(oauth::google_login_handler))
        .route("/auth/google/callback", get(oauth::google_callback_handler))
        .route("/auth/github", get(oauth::github_login_handler))
        .route("/auth/github/callback", get(oauth::github_callback_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/is-auth", get(auth::is_authenticated_handler))
        .route("/auth/send-verify-otp", post(auth::send_verify_otp_handler))
        .route("/auth/verify-account", post(auth::verify_account_handler))
        .route("/user/me", get(user::me_handler))
        .route("/documents/upload", post(rest::upload_document_handler))
        .route("/documents/query", post(rest::query_document_handler))
        .route("/documents/documents", get(rest::list_documents_handler))
        .route("/documents/chat/{documentId}", get(rest::chat_history_handler))
        .route("/documents/{documentId}", delete(rest::delete_document_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_router = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .nest("/api", api_router)
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit(state.config.max_upload_bytes)))
        .layer(cors_layer(&state.config.client_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
