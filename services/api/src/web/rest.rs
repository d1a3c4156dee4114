//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the document endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Multipart, Path, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use docchat_core::{ChatMessage, DocumentSummary, Identity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    services::{
        conversation,
        ingestion::{self, UploadedFile},
    },
    web::{auth, state::AppState, user},
};

/// Name of the multipart part carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "document";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::refresh_handler,
        auth::is_authenticated_handler,
        auth::send_verify_otp_handler,
        auth::verify_account_handler,
        auth::send_reset_otp_handler,
        auth::reset_password_handler,
        user::me_handler,
        upload_document_handler,
        query_document_handler,
        list_documents_handler,
        chat_history_handler,
        delete_document_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::VerifyAccountRequest,
            auth::SendResetOtpRequest,
            auth::ResetPasswordRequest,
            auth::TokenResponse,
            auth::MessageResponse,
            user::UserDataResponse,
            user::UserData,
            UploadResponse,
            QueryRequest,
            QueryResponse,
            DocumentListResponse,
            DocumentEntry,
            ChatHistoryResponse,
            ChatMessageEntry,
            DeleteResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "DocChat API", description = "Authenticated question answering over uploaded documents.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub document_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub document_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct QueryResponse {
    pub answer: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl From<DocumentSummary> for DocumentEntry {
    fn from(summary: DocumentSummary) -> Self {
        Self {
            id: summary.id,
            filename: summary.filename,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            last_activity_at: summary.last_activity_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentEntry>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEntry {
    /// `user` or `ai`.
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageEntry {
    fn from(message: ChatMessage) -> Self {
        Self {
            kind: message.role.as_str().to_string(),
            content: message.content,
            created_at: message.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessageEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Reads the `document` part of the form, if present.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("untitled").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        return Ok(Some(UploadedFile {
            filename,
            content_type,
            data,
        }));
    }
    Ok(None)
}

/// Upload a PDF or DOCX document.
///
/// Accepts a multipart/form-data request whose `document` part holds the file.
#[utoipa::path(
    post,
    path = "/api/documents/upload",
    request_body(content_type = "multipart/form-data", description = "The document to upload in a `document` part."),
    responses(
        (status = 200, description = "Document stored", body = UploadResponse),
        (status = 400, description = "No file, or file larger than 5MB"),
        (status = 415, description = "Unsupported file type"),
        (status = 500, description = "DOCX extraction failed")
    ),
    security(("bearer" = []))
)]
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file = read_upload(&mut multipart).await?;
    let document_id = ingestion::upload(&state, identity.id, file).await?;
    Ok(Json(UploadResponse {
        message: "Document uploaded successfully".to_string(),
        document_id,
    }))
}

/// Ask a question about one of the caller's documents.
#[utoipa::path(
    post,
    path = "/api/documents/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Model answer, or `Document not found.`", body = QueryResponse),
        (status = 400, description = "Question or documentId missing"),
        (status = 500, description = "Query failed")
    ),
    security(("bearer" = []))
)]
pub async fn query_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if req.question.trim().is_empty() || req.document_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Question and documentId are required".to_string(),
        ));
    }

    // An id that is not a UUID cannot name any document.
    let answer = match Uuid::parse_str(req.document_id.trim()) {
        Ok(document_id) => {
            conversation::query(&state, identity.id, document_id, &req.question).await?
        }
        Err(_) => docchat_core::conversation::DOCUMENT_NOT_FOUND_ANSWER.to_string(),
    };
    Ok(Json(QueryResponse { answer }))
}

/// List the caller's documents, most recently active first.
#[utoipa::path(
    get,
    path = "/api/documents/documents",
    responses((status = 200, description = "The caller's documents", body = DocumentListResponse)),
    security(("bearer" = []))
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = conversation::list_documents(&state, identity.id).await?;
    Ok(Json(DocumentListResponse {
        documents: documents.into_iter().map(DocumentEntry::from).collect(),
    }))
}

/// Conversation history for one of the caller's documents.
#[utoipa::path(
    get,
    path = "/api/documents/chat/{documentId}",
    params(("documentId" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Messages in order; empty before the first question", body = ChatHistoryResponse),
        (status = 404, description = "The caller has no such document")
    ),
    security(("bearer" = []))
)]
pub async fn chat_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(document_id): Path<String>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let document_id = Uuid::parse_str(&document_id)
        .map_err(|_| ApiError::NotFound("Document not found".to_string()))?;
    let messages = conversation::get_history(&state, identity.id, document_id).await?;
    Ok(Json(ChatHistoryResponse {
        messages: messages.into_iter().map(ChatMessageEntry::from).collect(),
    }))
}

/// Delete one of the caller's documents together with its conversation.
#[utoipa::path(
    delete,
    path = "/api/documents/{documentId}",
    params(("documentId" = String, Path, description = "Document id")),
    responses((status = 200, description = "Deleted, or nothing to delete", body = DeleteResponse)),
    security(("bearer" = []))
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(document_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if let Ok(document_id) = Uuid::parse_str(&document_id) {
        conversation::delete_document(&state, identity.id, document_id).await?;
    }
    Ok(Json(DeleteResponse {
        message: "Document and chat history deleted successfully".to_string(),
    }))
}
