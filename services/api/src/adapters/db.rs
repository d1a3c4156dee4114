//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docchat_core::{
    ports::{DatabaseService, PortError, PortResult},
    AuthProvider, Chat, ChatMessage, Document, DocumentSummary, MessageRole, OneTimeCode, User,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

const USER_COLUMNS: &str = "id, name, email, password_hash, photo, auth_provider, provider_id, \
     is_account_verified, verify_otp, verify_otp_expires_at, reset_otp, reset_otp_expires_at, \
     refresh_token, created_at, updated_at";

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    password_hash: Option<String>,
    photo: String,
    auth_provider: String,
    provider_id: Option<String>,
    is_account_verified: bool,
    verify_otp: Option<String>,
    verify_otp_expires_at: Option<DateTime<Utc>>,
    reset_otp: Option<String>,
    reset_otp_expires_at: Option<DateTime<Utc>>,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn code_from_columns(
    code: Option<String>,
    expires_at: Option<DateTime<Utc>>,
) -> Option<OneTimeCode> {
    match (code, expires_at) {
        (Some(code), Some(expires_at)) => Some(OneTimeCode { code, expires_at }),
        _ => None,
    }
}

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let auth_provider = AuthProvider::parse(&self.auth_provider).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown auth provider '{}'", self.auth_provider))
        })?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            photo: self.photo,
            auth_provider,
            provider_id: self.provider_id,
            is_account_verified: self.is_account_verified,
            verify_otp: code_from_columns(self.verify_otp, self.verify_otp_expires_at),
            reset_otp: code_from_columns(self.reset_otp, self.reset_otp_expires_at),
            refresh_token: self.refresh_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    user_id: Uuid,
    filename: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            user_id: self.user_id,
            filename: self.filename,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct DocumentSummaryRecord {
    id: Uuid,
    filename: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}
impl DocumentSummaryRecord {
    fn to_domain(self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            filename: self.filename,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_activity_at: self.last_activity_at,
        }
    }
}

#[derive(FromRow)]
struct ChatRecord {
    id: Uuid,
    user_id: Uuid,
    document_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ChatMessageRecord {
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}
impl ChatMessageRecord {
    fn to_domain(self) -> PortResult<ChatMessage> {
        let role = MessageRole::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("Unknown message role '{}'", self.role)))?;
        Ok(ChatMessage {
            role,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

impl DbAdapter {
    async fn fetch_user(&self, filter: &str, value: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, filter);
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(UserRecord::to_domain)
            .transpose()
    }

    async fn load_chat(&self, record: ChatRecord) -> PortResult<Chat> {
        let messages = sqlx::query_as::<_, ChatMessageRecord>(
            "SELECT role, content, created_at FROM chat_messages WHERE chat_id = $1 ORDER BY id",
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(ChatMessageRecord::to_domain)
        .collect::<PortResult<Vec<_>>>()?;

        Ok(Chat {
            id: record.id,
            user_id: record.user_id,
            document_id: record.document_id,
            messages,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    async fn fetch_chat_record(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Option<ChatRecord>> {
        sqlx::query_as::<_, ChatRecord>(
            "SELECT id, user_id, document_id, created_at, updated_at FROM chats \
             WHERE user_id = $1 AND document_id = $2",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?
            .to_domain()
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        self.fetch_user("email = $1", email).await
    }

    async fn find_user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> PortResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE auth_provider = $1 AND provider_id = $2",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(provider.as_str())
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(UserRecord::to_domain)
            .transpose()
    }

    async fn find_user_by_refresh_token(&self, refresh_token: &str) -> PortResult<Option<User>> {
        self.fetch_user("refresh_token = $1", refresh_token).await
    }

    async fn create_user(&self, user: &User) -> PortResult<()> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            USER_COLUMNS
        );
        sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.photo)
            .bind(user.auth_provider.as_str())
            .bind(&user.provider_id)
            .bind(user.is_account_verified)
            .bind(user.verify_otp.as_ref().map(|c| c.code.clone()))
            .bind(user.verify_otp.as_ref().map(|c| c.expires_at))
            .bind(user.reset_otp.as_ref().map(|c| c.code.clone()))
            .bind(user.reset_otp.as_ref().map(|c| c.expires_at))
            .bind(&user.refresh_token)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let duplicate = e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if duplicate {
                    PortError::Conflict(format!("Email {} is already registered", user.email))
                } else {
                    unexpected(e)
                }
            })?;
        Ok(())
    }

    async fn save_user(&self, user: &User) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, photo = $5, \
             auth_provider = $6, provider_id = $7, is_account_verified = $8, \
             verify_otp = $9, verify_otp_expires_at = $10, reset_otp = $11, \
             reset_otp_expires_at = $12, refresh_token = $13, updated_at = $14 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.photo)
        .bind(user.auth_provider.as_str())
        .bind(&user.provider_id)
        .bind(user.is_account_verified)
        .bind(user.verify_otp.as_ref().map(|c| c.code.clone()))
        .bind(user.verify_otp.as_ref().map(|c| c.expires_at))
        .bind(user.reset_otp.as_ref().map(|c| c.code.clone()))
        .bind(user.reset_otp.as_ref().map(|c| c.expires_at))
        .bind(&user.refresh_token)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user.id)));
        }
        Ok(())
    }

    async fn create_document(
        &self,
        user_id: Uuid,
        filename: &str,
        content: &str,
    ) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "INSERT INTO documents (id, user_id, filename, content) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, filename, content, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(filename)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_document_for_user(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Option<Document>> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, user_id, filename, content, created_at, updated_at FROM documents \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(DocumentRecord::to_domain))
    }

    async fn list_documents_for_user(&self, user_id: Uuid) -> PortResult<Vec<DocumentSummary>> {
        let records = sqlx::query_as::<_, DocumentSummaryRecord>(
            "SELECT d.id, d.filename, d.created_at, d.updated_at, \
                    COALESCE(c.updated_at, d.created_at) AS last_activity_at \
             FROM documents d \
             LEFT JOIN chats c ON c.document_id = d.id AND c.user_id = d.user_id \
             WHERE d.user_id = $1 \
             ORDER BY last_activity_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(DocumentSummaryRecord::to_domain).collect())
    }

    async fn touch_document(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE documents SET updated_at = NOW() WHERE id = $1 AND user_id = $2")
            .bind(document_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_document_for_user(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1 AND user_id = $2")
            .bind(document_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Option<Chat>> {
        match self.fetch_chat_record(user_id, document_id).await? {
            Some(record) => Ok(Some(self.load_chat(record).await?)),
            None => Ok(None),
        }
    }

    async fn get_or_create_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Chat> {
        sqlx::query(
            "INSERT INTO chats (id, user_id, document_id) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, document_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(document_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = self
            .fetch_chat_record(user_id, document_id)
            .await?
            .ok_or_else(|| PortError::Unexpected("Chat vanished after insert".to_string()))?;
        self.load_chat(record).await
    }

    async fn append_chat_message(&self, chat_id: Uuid, message: &ChatMessage) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        sqlx::query(
            "INSERT INTO chat_messages (chat_id, role, content, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(chat_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        sqlx::query("UPDATE chats SET updated_at = NOW() WHERE id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)
    }

    async fn delete_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM chats WHERE user_id = $1 AND document_id = $2")
            .bind(user_id)
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
