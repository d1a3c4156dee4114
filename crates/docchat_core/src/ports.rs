//! crates/docchat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuthProvider, Chat, ChatMessage, Document, DocumentSummary, FederatedProfile, OutgoingEmail,
    User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Provider email is not verified")]
    EmailNotVerified,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistent store for users, documents and conversations.
///
/// Every document and chat operation takes the owner's id and filters by it, so
/// an id belonging to another user behaves exactly like an id that does not exist.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>>;

    async fn find_user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> PortResult<Option<User>>;

    async fn find_user_by_refresh_token(&self, refresh_token: &str) -> PortResult<Option<User>>;

    /// Inserts a new user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: &User) -> PortResult<()>;

    /// Overwrites the stored record with `user` (whole-record write).
    async fn save_user(&self, user: &User) -> PortResult<()>;

    // --- Documents ---
    async fn create_document(
        &self,
        user_id: Uuid,
        filename: &str,
        content: &str,
    ) -> PortResult<Document>;

    async fn get_document_for_user(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Option<Document>>;

    /// Most recently active first.
    async fn list_documents_for_user(&self, user_id: Uuid) -> PortResult<Vec<DocumentSummary>>;

    /// Advances the document's `updated_at` to now.
    async fn touch_document(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()>;

    /// Deleting an unknown document is not an error.
    async fn delete_document_for_user(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()>;

    // --- Conversations ---
    async fn get_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Option<Chat>>;

    /// Returns the existing chat for the pair, creating an empty one if needed.
    async fn get_or_create_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Chat>;

    /// Appends one message and refreshes the chat's `updated_at`.
    async fn append_chat_message(&self, chat_id: Uuid, message: &ChatMessage) -> PortResult<()>;

    async fn delete_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait AnswerGenerationService: Send + Sync {
    /// Sends one fully assembled prompt to the language model and returns its text.
    async fn generate_answer(&self, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait MailService: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> PortResult<()>;
}

#[async_trait]
pub trait IdentityProviderService: Send + Sync {
    /// The provider consent URL the browser is redirected to.
    fn authorize_url(&self, provider: AuthProvider) -> PortResult<String>;

    /// Exchanges an authorization code for the caller's provider profile.
    async fn fetch_profile(&self, provider: AuthProvider, code: &str)
        -> PortResult<FederatedProfile>;
}

/// Format-specific plain-text extraction. Implementations are CPU-bound.
pub trait TextExtractionService: Send + Sync {
    fn extract_pdf(&self, data: &[u8]) -> PortResult<String>;
    fn extract_docx(&self, data: &[u8]) -> PortResult<String>;
}
