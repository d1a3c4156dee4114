//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of `DatabaseService`, used with `STORE=memory`
//! and by the integration tests. Nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use docchat_core::{
    ports::{DatabaseService, PortError, PortResult},
    AuthProvider, Chat, ChatMessage, Document, DocumentSummary, User,
};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemoryData {
    users: HashMap<Uuid, User>,
    documents: HashMap<Uuid, Document>,
    chats: HashMap<Uuid, Chat>,
}

impl MemoryData {
    fn chat_for(&self, user_id: Uuid, document_id: Uuid) -> Option<&Chat> {
        self.chats
            .values()
            .find(|c| c.user_id == user_id && c.document_id == document_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let data = self.data.lock().await;
        data.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let data = self.data.lock().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> PortResult<Option<User>> {
        let data = self.data.lock().await;
        Ok(data
            .users
            .values()
            .find(|u| u.auth_provider == provider && u.provider_id.as_deref() == Some(provider_id))
            .cloned())
    }

    async fn find_user_by_refresh_token(&self, refresh_token: &str) -> PortResult<Option<User>> {
        let data = self.data.lock().await;
        Ok(data
            .users
            .values()
            .find(|u| u.refresh_token.as_deref() == Some(refresh_token))
            .cloned())
    }

    async fn create_user(&self, user: &User) -> PortResult<()> {
        let mut data = self.data.lock().await;
        if data.users.values().any(|u| u.email == user.email) {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                user.email
            )));
        }
        data.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> PortResult<()> {
        let mut data = self.data.lock().await;
        match data.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(PortError::NotFound(format!("User {} not found", user.id))),
        }
    }

    async fn create_document(
        &self,
        user_id: Uuid,
        filename: &str,
        content: &str,
    ) -> PortResult<Document> {
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            user_id,
            filename: filename.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.data
            .lock()
            .await
            .documents
            .insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document_for_user(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Option<Document>> {
        let data = self.data.lock().await;
        Ok(data
            .documents
            .get(&document_id)
            .filter(|d| d.user_id == user_id)
            .cloned())
    }

    async fn list_documents_for_user(&self, user_id: Uuid) -> PortResult<Vec<DocumentSummary>> {
        let data = self.data.lock().await;
        let mut summaries: Vec<DocumentSummary> = data
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .map(|d| DocumentSummary {
                id: d.id,
                filename: d.filename.clone(),
                created_at: d.created_at,
                updated_at: d.updated_at,
                last_activity_at: data
                    .chat_for(user_id, d.id)
                    .map(|c| c.updated_at)
                    .unwrap_or(d.created_at),
            })
            .collect();
        summaries.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(summaries)
    }

    async fn touch_document(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        if let Some(document) = data
            .documents
            .get_mut(&document_id)
            .filter(|d| d.user_id == user_id)
        {
            document.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_document_for_user(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        if data
            .documents
            .get(&document_id)
            .is_some_and(|d| d.user_id == user_id)
        {
            data.documents.remove(&document_id);
        }
        Ok(())
    }

    async fn get_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Option<Chat>> {
        let data = self.data.lock().await;
        Ok(data.chat_for(user_id, document_id).cloned())
    }

    async fn get_or_create_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Chat> {
        let mut data = self.data.lock().await;
        if let Some(chat) = data.chat_for(user_id, document_id) {
            return Ok(chat.clone());
        }
        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id,
            document_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        data.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn append_chat_message(&self, chat_id: Uuid, message: &ChatMessage) -> PortResult<()> {
        let mut data = self.data.lock().await;
        let chat = data
            .chats
            .get_mut(&chat_id)
            .ok_or_else(|| PortError::NotFound(format!("Chat {} not found", chat_id)))?;
        chat.messages.push(message.clone());
        chat.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        data.chats
            .retain(|_, c| !(c.user_id == user_id && c.document_id == document_id));
        Ok(())
    }
}
