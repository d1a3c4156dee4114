//! services/api/src/services/password.rs
//!
//! Argon2 password hashing. Hashing is CPU-heavy, so both operations run on the
//! blocking thread pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

use crate::error::ApiError;

pub async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                ApiError::Internal("Failed to hash password".to_string())
            })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// `Ok(false)` for a wrong password; `Err` only when the stored hash is unreadable.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&stored_hash).map_err(|e| {
            error!("Failed to parse password hash: {:?}", e);
            ApiError::Internal("Authentication error".to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_not_plaintext_and_verifies() {
        let hash = hash_password("longpassword1").await.unwrap();
        assert_ne!(hash, "longpassword1");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("longpassword1", &hash).await.unwrap());
        assert!(!verify_password("wrongpassword", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn unreadable_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").await.is_err());
    }
}
