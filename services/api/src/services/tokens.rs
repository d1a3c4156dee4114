//! services/api/src/services/tokens.rs
//!
//! Access/refresh token issuance, rotation and revocation.
//!
//! Access tokens live 15 minutes and are never stored. Refresh tokens live 7 days,
//! are written to the owning user's record (one live value per user) and travel
//! only in the `refreshToken` HTTP-only cookie.

use chrono::{DateTime, Duration, Utc};
use docchat_core::{ports::DatabaseService, User};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

pub const REFRESH_COOKIE_NAME: &str = "refreshToken";
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
}

/// Why a token failed verification. Expiry is reported separately so the
/// client can refresh instead of logging out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
}

/// The result of a successful login: the access token for the JSON body and the
/// `Set-Cookie` value carrying the refresh token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_cookie: String,
}

pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    production: bool,
}

impl TokenService {
    pub fn new(access_secret: &str, refresh_secret: &str, production: bool) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            production,
        }
    }

    //=====================================================================================
    // Stateless signing and verification
    //=====================================================================================

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        self.issue_access_token_at(user_id, Utc::now())
    }

    /// Signs an access token as if issued at `issued_at`.
    pub fn issue_access_token_at(
        &self,
        user_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)).timestamp(),
            jti: None,
        };
        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign access token: {}", e)))
    }

    fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(REFRESH_TOKEN_TTL_DAYS)).timestamp(),
            // Unique per issue so a re-login always replaces the stored value.
            jti: Some(Uuid::new_v4().to_string()),
        };
        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign refresh token: {}", e)))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Uuid, TokenError> {
        verify(token, &self.access_decoding)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Uuid, TokenError> {
        verify(token, &self.refresh_decoding)
    }

    //=====================================================================================
    // Cookies
    //=====================================================================================

    fn cookie_attributes(&self) -> &'static str {
        if self.production {
            "HttpOnly; Secure; SameSite=None; Path=/"
        } else {
            "HttpOnly; SameSite=Strict; Path=/"
        }
    }

    pub fn refresh_cookie(&self, refresh_token: &str) -> String {
        format!(
            "{}={}; {}; Max-Age={}",
            REFRESH_COOKIE_NAME,
            refresh_token,
            self.cookie_attributes(),
            Duration::days(REFRESH_TOKEN_TTL_DAYS).num_seconds()
        )
    }

    pub fn clear_refresh_cookie(&self) -> String {
        format!(
            "{}=; {}; Max-Age=0",
            REFRESH_COOKIE_NAME,
            self.cookie_attributes()
        )
    }

    //=====================================================================================
    // Session lifecycle (touches the credential store)
    //=====================================================================================

    /// Issues both tokens for `user`, storing the refresh token on the record.
    /// Any refresh token issued earlier for this user stops being accepted.
    pub async fn issue(
        &self,
        db: &dyn DatabaseService,
        user: &mut User,
    ) -> Result<IssuedSession, ApiError> {
        let access_token = self.issue_access_token(user.id)?;
        let refresh_token = self.issue_refresh_token(user.id)?;

        user.refresh_token = Some(refresh_token.clone());
        user.updated_at = Utc::now();
        db.save_user(user).await?;
        info!("Issued session tokens for user {}", user.id);

        Ok(IssuedSession {
            access_token,
            refresh_cookie: self.refresh_cookie(&refresh_token),
        })
    }

    /// Exchanges a stored, valid refresh token for a new access token. The
    /// refresh token itself stays the same.
    pub async fn rotate_access(
        &self,
        db: &dyn DatabaseService,
        refresh_token: Option<&str>,
    ) -> Result<String, ApiError> {
        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::NoRefreshToken)?;

        let owner = db
            .find_user_by_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| ApiError::InvalidRefreshToken("Invalid refresh token".to_string()))?;

        match self.verify_refresh_token(refresh_token) {
            Ok(subject) if subject == owner.id => self.issue_access_token(subject),
            Ok(subject) => {
                warn!(
                    "Refresh token subject {} does not match record owner {}",
                    subject, owner.id
                );
                Err(ApiError::InvalidRefreshToken(
                    "Refresh token verification failed".to_string(),
                ))
            }
            Err(_) => Err(ApiError::InvalidRefreshToken(
                "Refresh token verification failed".to_string(),
            )),
        }
    }

    /// Clears the stored refresh token of its owner, if any, and returns the
    /// cookie-clearing header value. Never fails on an absent or unknown token.
    pub async fn revoke(
        &self,
        db: &dyn DatabaseService,
        refresh_token: Option<&str>,
    ) -> Result<String, ApiError> {
        if let Some(token) = refresh_token.filter(|t| !t.is_empty()) {
            if let Some(mut user) = db.find_user_by_refresh_token(token).await? {
                user.refresh_token = None;
                user.updated_at = Utc::now();
                db.save_user(&user).await?;
                info!("Revoked refresh token for user {}", user.id);
            }
        }
        Ok(self.clear_refresh_cookie())
    }
}

fn verify(token: &str, key: &DecodingKey) -> Result<Uuid, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::Invalid)
}

/// Reads one cookie value out of a raw `Cookie` header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|c| {
        let (key, value) = c.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}
