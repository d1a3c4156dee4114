//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: registration, login, logout, access-token
//! refresh, and the one-time-code flows for verification and password reset.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use docchat_core::Identity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    services::{
        credentials,
        tokens::{cookie_value, REFRESH_COOKIE_NAME},
    },
    web::{
        state::AppState,
        validation::{normalize_email, Checks, MIN_PASSWORD_LEN, OTP_LEN},
    },
};

const OTP_MESSAGE: &str = "OTP is required and must be 6 digits";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyAccountRequest {
    #[serde(default)]
    pub otp: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SendResetOtpRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub new_password: String,
}

/// Returned by every endpoint that hands out an access token. The refresh
/// token only ever travels in the `Set-Cookie` header.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub access_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
        })
    }
}

fn refresh_token_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, REFRESH_COOKIE_NAME))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a password account and sign it in
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, refresh cookie set", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Checks::new()
        .non_empty("name", &req.name, "Name is required")
        .email("email", &req.email)
        .min_len(
            "password",
            &req.password,
            MIN_PASSWORD_LEN,
            "Password must be 8 or more characters",
        )
        .finish()?;

    let email = normalize_email(&req.email);
    let session = credentials::register(&state, req.name.trim(), &email, &req.password).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session.refresh_cookie)],
        Json(TokenResponse {
            success: true,
            access_token: session.access_token,
        }),
    ))
}

/// POST /auth/login - Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, refresh cookie set", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account uses a federated provider")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Checks::new()
        .email("email", &req.email)
        .non_empty("password", &req.password, "Password is required")
        .finish()?;

    let email = normalize_email(&req.email);
    let session = credentials::login(&state, &email, &req.password).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session.refresh_cookie)],
        Json(TokenResponse {
            success: true,
            access_token: session.access_token,
        }),
    ))
}

/// POST /auth/logout - Revoke the refresh token and clear its cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let cleared = credentials::logout(&state, refresh_token_from(&headers)).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cleared)],
        MessageResponse::ok("Logged Out Successfully"),
    ))
}

/// POST /auth/refresh - Exchange the refresh cookie for a new access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 401, description = "No refresh token provided"),
        (status = 403, description = "Refresh token rejected")
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let access_token = state
        .tokens
        .rotate_access(state.db.as_ref(), refresh_token_from(&headers))
        .await?;
    Ok(Json(TokenResponse {
        success: true,
        access_token,
    }))
}

/// GET /auth/is-auth - Succeeds whenever the access token is accepted
#[utoipa::path(
    get,
    path = "/api/auth/is-auth",
    responses(
        (status = 200, description = "Authenticated", body = MessageResponse),
        (status = 401, description = "Missing, invalid or expired access token")
    ),
    security(("bearer" = []))
)]
pub async fn is_authenticated_handler() -> Json<MessageResponse> {
    MessageResponse::ok("User is authenticated")
}

/// POST /auth/send-verify-otp - Mail a verification code to the signed-in user
#[utoipa::path(
    post,
    path = "/api/auth/send-verify-otp",
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 400, description = "Account already verified")
    ),
    security(("bearer" = []))
)]
pub async fn send_verify_otp_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<MessageResponse>, ApiError> {
    credentials::send_verify_otp(&state, identity.id).await?;
    Ok(MessageResponse::ok("Verification OTP sent to your email"))
}

/// POST /auth/verify-account - Confirm the signed-in user's email with a code
#[utoipa::path(
    post,
    path = "/api/auth/verify-account",
    request_body = VerifyAccountRequest,
    responses(
        (status = 200, description = "Account verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired code")
    ),
    security(("bearer" = []))
)]
pub async fn verify_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<VerifyAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    Checks::new()
        .exact_len("otp", &req.otp, OTP_LEN, OTP_MESSAGE)
        .finish()?;

    credentials::verify_account(&state, identity.id, &req.otp).await?;
    Ok(MessageResponse::ok("Account verified successfully"))
}

/// POST /auth/send-reset-otp - Mail a password reset code
#[utoipa::path(
    post,
    path = "/api/auth/send-reset-otp",
    request_body = SendResetOtpRequest,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 400, description = "Account uses a federated provider"),
        (status = 404, description = "No account with this email")
    )
)]
pub async fn send_reset_otp_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendResetOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    Checks::new().email("email", &req.email).finish()?;

    credentials::send_reset_otp(&state, &normalize_email(&req.email)).await?;
    Ok(MessageResponse::ok("Password Reset OTP sent to your email"))
}

/// POST /auth/reset-password - Set a new password using a reset code
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Validation failed, or invalid or expired code"),
        (status = 404, description = "No account with this email")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    Checks::new()
        .email("email", &req.email)
        .exact_len("otp", &req.otp, OTP_LEN, OTP_MESSAGE)
        .min_len(
            "newPassword",
            &req.new_password,
            MIN_PASSWORD_LEN,
            "New password must be 8 or more characters",
        )
        .finish()?;

    credentials::reset_password(
        &state,
        &normalize_email(&req.email),
        &req.otp,
        &req.new_password,
    )
    .await?;
    Ok(MessageResponse::ok("Password has been reset successfully"))
}
