//! services/api/src/services/credentials.rs
//!
//! Registration, password login, one-time-code verification and reset, logout,
//! and federated (OAuth) find-or-create.

use chrono::{Duration, Utc};
use docchat_core::{
    otp::{self, OneTimeCode, RESET_OTP_TTL_MINUTES, VERIFY_OTP_TTL_MINUTES},
    ports::{DatabaseService, PortError, PortResult},
    FederatedProfile, OutgoingEmail, User,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    services::{
        password::{hash_password, verify_password},
        tokens::IssuedSession,
    },
    web::state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const MAIL_FAILED: &str = "An error occurred while trying to send the email.";

//=========================================================================================
// Password accounts
//=========================================================================================

/// Creates a direct-credentials account and signs it in. The welcome mail is
/// best-effort; a mail failure does not fail the registration.
pub async fn register(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<IssuedSession, ApiError> {
    let conflict =
        || ApiError::Conflict("User already exists. Please log in or use another email.".into());

    if state.db.find_user_by_email(email).await?.is_some() {
        return Err(conflict());
    }

    let password_hash = hash_password(password).await?;
    let mut user = User::with_password(name.to_string(), email.to_string(), password_hash);
    state.db.create_user(&user).await.map_err(|e| match e {
        PortError::Conflict(_) => conflict(),
        other => other.into(),
    })?;
    info!("Registered user {}", user.id);

    let welcome = OutgoingEmail {
        to: user.email.clone(),
        subject: "Welcome to DocChat".to_string(),
        text: Some(format!(
            "Hello {}, Welcome to our site.\nWe are happy to see you here. Please verify your account to get started.",
            user.name
        )),
        html: None,
    };
    if let Err(e) = state.mailer.send(welcome).await {
        warn!("Welcome email for user {} was not sent: {}", user.id, e);
    }

    state.tokens.issue(state.db.as_ref(), &mut user).await
}

pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<IssuedSession, ApiError> {
    let mut user = state
        .db
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let stored_hash = match (&user.password_hash, user.uses_password()) {
        (Some(hash), true) => hash.clone(),
        _ => {
            return Err(ApiError::WrongProvider(format!(
                "You signed up with {}. Please log in using that method.",
                user.auth_provider
            )))
        }
    };

    if !verify_password(password, &stored_hash).await? {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    state.tokens.issue(state.db.as_ref(), &mut user).await
}

pub async fn logout(state: &AppState, refresh_token: Option<&str>) -> Result<String, ApiError> {
    state.tokens.revoke(state.db.as_ref(), refresh_token).await
}

//=========================================================================================
// Account verification
//=========================================================================================

pub async fn send_verify_otp(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    let mut user = state.db.get_user_by_id(user_id).await?;
    if user.is_account_verified {
        return Err(ApiError::BadRequest("Account already verified".to_string()));
    }

    let code = OneTimeCode::generate(Duration::minutes(VERIFY_OTP_TTL_MINUTES), Utc::now());
    let email = OutgoingEmail {
        to: user.email.clone(),
        subject: "Account Verification OTP".to_string(),
        text: Some(format!(
            "Your OTP is {}. Verify your account ({}) using this code within {} minutes.",
            code.code, user.email, VERIFY_OTP_TTL_MINUTES
        )),
        html: None,
    };

    user.verify_otp = Some(code);
    user.updated_at = Utc::now();
    state.db.save_user(&user).await?;

    state.mailer.send(email).await.map_err(|e| {
        error!("Failed to send verification email to user {}: {}", user.id, e);
        ApiError::Upstream(MAIL_FAILED.to_string())
    })
}

pub async fn verify_account(
    state: &AppState,
    user_id: Uuid,
    candidate: &str,
) -> Result<(), ApiError> {
    let mut user = state.db.get_user_by_id(user_id).await?;
    otp::check_slot(user.verify_otp.as_ref(), candidate, Utc::now())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    user.is_account_verified = true;
    user.verify_otp = None;
    user.updated_at = Utc::now();
    state.db.save_user(&user).await?;
    info!("User {} verified their account", user.id);
    Ok(())
}

//=========================================================================================
// Password reset
//=========================================================================================

fn ensure_password_account(user: &User) -> Result<(), ApiError> {
    if user.auth_provider.is_federated() {
        return Err(ApiError::BadRequest(format!(
            "This account is linked with {}. You cannot reset password here.",
            user.auth_provider
        )));
    }
    Ok(())
}

pub async fn send_reset_otp(state: &AppState, email: &str) -> Result<(), ApiError> {
    let mut user = state
        .db
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found with this email".to_string()))?;
    ensure_password_account(&user)?;

    let code = OneTimeCode::generate(Duration::minutes(RESET_OTP_TTL_MINUTES), Utc::now());
    let message = OutgoingEmail {
        to: user.email.clone(),
        subject: "Password Reset OTP".to_string(),
        text: Some(format!(
            "Your OTP for resetting the password of {} is {}. It expires in {} minutes.",
            user.email, code.code, RESET_OTP_TTL_MINUTES
        )),
        html: None,
    };

    user.reset_otp = Some(code);
    user.updated_at = Utc::now();
    state.db.save_user(&user).await?;

    state.mailer.send(message).await.map_err(|e| {
        error!("Failed to send password reset email to user {}: {}", user.id, e);
        ApiError::Upstream(MAIL_FAILED.to_string())
    })
}

pub async fn reset_password(
    state: &AppState,
    email: &str,
    candidate: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    let mut user = state
        .db
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    ensure_password_account(&user)?;

    otp::check_slot(user.reset_otp.as_ref(), candidate, Utc::now())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    user.password_hash = Some(hash_password(new_password).await?);
    user.reset_otp = None;
    user.updated_at = Utc::now();
    state.db.save_user(&user).await?;
    info!("Password reset for user {}", user.id);
    Ok(())
}

//=========================================================================================
// Federated identities
//=========================================================================================

/// Resolves a provider profile to an account: by provider identity first, then
/// by email (linking the provider onto that account), else a new account.
pub async fn find_or_create_federated_user(
    db: &dyn DatabaseService,
    profile: &FederatedProfile,
) -> PortResult<User> {
    if let Some(user) = db
        .find_user_by_provider(profile.provider, &profile.provider_id)
        .await?
    {
        return Ok(user);
    }

    if let Some(mut user) = db.find_user_by_email(&profile.email).await? {
        user.link_federated(profile);
        user.updated_at = Utc::now();
        db.save_user(&user).await?;
        info!("Linked {} identity onto user {}", profile.provider, user.id);
        return Ok(user);
    }

    let user = User::from_federated(profile);
    db.create_user(&user).await?;
    info!("Created user {} from {} profile", user.id, profile.provider);
    Ok(user)
}

pub async fn federated_login(
    state: &AppState,
    profile: &FederatedProfile,
) -> Result<IssuedSession, ApiError> {
    let mut user = find_or_create_federated_user(state.db.as_ref(), profile).await?;
    state.tokens.issue(state.db.as_ref(), &mut user).await
}
