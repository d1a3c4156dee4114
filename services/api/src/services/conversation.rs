//! services/api/src/services/conversation.rs
//!
//! The per-document question loop and the document/history reads around it.

use docchat_core::{
    conversation::{build_prompt, DOCUMENT_NOT_FOUND_ANSWER},
    ChatMessage, DocumentSummary, PortResult,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::{error::ApiError, web::state::AppState};

/// Answers `question` about one of the caller's documents and records the
/// exchange. A document the caller does not own yields a soft answer.
pub async fn query(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
    question: &str,
) -> Result<String, ApiError> {
    run_query(state, user_id, document_id, question)
        .await
        .map_err(|e| {
            error!("Query on document {} failed: {}", document_id, e);
            ApiError::Upstream(format!("Query failed: {}", e))
        })
}

async fn run_query(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
    question: &str,
) -> PortResult<String> {
    let Some(document) = state.db.get_document_for_user(user_id, document_id).await? else {
        return Ok(DOCUMENT_NOT_FOUND_ANSWER.to_string());
    };

    let mut chat = state.db.get_or_create_chat(user_id, document_id).await?;
    let asked = ChatMessage::user(question);
    state.db.append_chat_message(chat.id, &asked).await?;
    chat.messages.push(asked);

    let prompt = build_prompt(&document, &chat.messages);
    let answer = state.answer_adapter.generate_answer(&prompt).await?;

    state
        .db
        .append_chat_message(chat.id, &ChatMessage::ai(answer.clone()))
        .await?;
    state.db.touch_document(user_id, document_id).await?;
    info!("Answered question on document {} for user {}", document_id, user_id);

    Ok(answer)
}

/// All messages of the caller's conversation about `document_id`, oldest first.
pub async fn get_history(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
) -> Result<Vec<ChatMessage>, ApiError> {
    if state
        .db
        .get_document_for_user(user_id, document_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Document not found".to_string()));
    }

    Ok(state
        .db
        .get_chat(user_id, document_id)
        .await?
        .map(|chat| chat.messages)
        .unwrap_or_default())
}

pub async fn delete_document(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
) -> Result<(), ApiError> {
    state.db.delete_chat(user_id, document_id).await?;
    state.db.delete_document_for_user(user_id, document_id).await?;
    info!("Deleted document {} for user {}", document_id, user_id);
    Ok(())
}

pub async fn list_documents(
    state: &AppState,
    user_id: Uuid,
) -> Result<Vec<DocumentSummary>, ApiError> {
    Ok(state.db.list_documents_for_user(user_id).await?)
}
