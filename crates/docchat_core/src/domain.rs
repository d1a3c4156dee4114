//! crates/docchat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::otp::OneTimeCode;

//=========================================================================================
// Users and Identity
//=========================================================================================

/// How an account authenticates. Exactly one provider owns an account at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthProvider {
    Credentials,
    Google,
    Github,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Credentials => "credentials",
            AuthProvider::Google => "google",
            AuthProvider::Github => "github",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "credentials" => Some(AuthProvider::Credentials),
            "google" => Some(AuthProvider::Google),
            "github" => Some(AuthProvider::Github),
            _ => None,
        }
    }

    pub fn is_federated(&self) -> bool {
        !matches!(self, AuthProvider::Credentials)
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A full user record as persisted. Contains sensitive data (password hash,
/// one-time codes, refresh token) and must not leave the service layer.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub photo: String,
    pub auth_provider: AuthProvider,
    pub provider_id: Option<String>,
    pub is_account_verified: bool,
    pub verify_otp: Option<OneTimeCode>,
    pub reset_otp: Option<OneTimeCode>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A new direct-credentials account. Starts unverified.
    pub fn with_password(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash: Some(password_hash),
            photo: String::new(),
            auth_provider: AuthProvider::Credentials,
            provider_id: None,
            is_account_verified: false,
            verify_otp: None,
            reset_otp: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A new account created from a provider profile. The provider has already
    /// verified the email, so the account starts verified.
    pub fn from_federated(profile: &FederatedProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            password_hash: None,
            photo: profile.photo.clone().unwrap_or_default(),
            auth_provider: profile.provider,
            provider_id: Some(profile.provider_id.clone()),
            is_account_verified: true,
            verify_otp: None,
            reset_otp: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves an existing account onto a federated identity. The password hash is
    /// dropped so the account can no longer take the password path.
    pub fn link_federated(&mut self, profile: &FederatedProfile) {
        self.auth_provider = profile.provider;
        self.provider_id = Some(profile.provider_id.clone());
        self.password_hash = None;
        if let Some(photo) = profile.photo.as_ref().filter(|p| !p.is_empty()) {
            self.photo = photo.clone();
        }
    }

    pub fn uses_password(&self) -> bool {
        self.auth_provider == AuthProvider::Credentials && self.password_hash.is_some()
    }

    /// The password-free view handed to request handlers.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            photo: self.photo.clone(),
            auth_provider: self.auth_provider,
            is_account_verified: self.is_account_verified,
        }
    }
}

/// The authenticated caller, as attached to a request by the session middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub auth_provider: AuthProvider,
    pub is_account_verified: bool,
}

/// Profile data returned by an OAuth provider after a successful code exchange.
#[derive(Debug, Clone)]
pub struct FederatedProfile {
    pub provider: AuthProvider,
    pub provider_id: String,
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
}

//=========================================================================================
// Documents and Conversations
//=========================================================================================

/// A document uploaded by a user. `content` never changes after creation.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for a user's document shelf.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Conversation `updated_at`, or `created_at` when no conversation exists yet.
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Ai,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Ai => "ai",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(MessageRole::User),
            "ai" => Some(MessageRole::Ai),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Ai,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// The conversation for one (user, document) pair. Messages are append-only.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//=========================================================================================
// Mail
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(provider: AuthProvider, photo: Option<&str>) -> FederatedProfile {
        FederatedProfile {
            provider,
            provider_id: "ext-42".to_string(),
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            photo: photo.map(str::to_string),
        }
    }

    #[test]
    fn federated_accounts_start_verified_without_password() {
        let user = User::from_federated(&profile(AuthProvider::Github, Some("https://img")));
        assert!(user.is_account_verified);
        assert!(user.password_hash.is_none());
        assert!(!user.uses_password());
        assert_eq!(user.photo, "https://img");
    }

    #[test]
    fn linking_drops_password_and_keeps_photo_when_profile_has_none() {
        let mut user = User::with_password("Ana".into(), "ana@x.com".into(), "hash".into());
        user.photo = "old.png".to_string();
        user.link_federated(&profile(AuthProvider::Google, None));
        assert_eq!(user.auth_provider, AuthProvider::Google);
        assert_eq!(user.provider_id.as_deref(), Some("ext-42"));
        assert!(user.password_hash.is_none());
        assert_eq!(user.photo, "old.png");
    }

    #[test]
    fn provider_names_round_trip() {
        for p in [AuthProvider::Credentials, AuthProvider::Google, AuthProvider::Github] {
            assert_eq!(AuthProvider::parse(p.as_str()), Some(p));
        }
        assert_eq!(AuthProvider::parse("facebook"), None);
    }
}
