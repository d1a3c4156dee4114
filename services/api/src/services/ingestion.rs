//! services/api/src/services/ingestion.rs
//!
//! Upload validation and text extraction. This is the only path that creates a
//! `Document`.

use std::sync::Arc;

use bytes::Bytes;
use docchat_core::ports::{PortResult, TextExtractionService};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::ApiError, web::state::AppState};

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// One file part as received from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_mime(content_type: &str) -> Option<Self> {
        // Ignore parameters such as `; charset=...`.
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence {
            PDF_MIME => Some(Self::Pdf),
            DOCX_MIME => Some(Self::Docx),
            _ => None,
        }
    }
}

const MIB: usize = 1024 * 1024;

/// `5MB` for whole mebibytes, otherwise the exact byte count.
fn size_label(bytes: usize) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn pdf_placeholder(filename: &str) -> String {
    format!(
        "PDF document uploaded: {}. Text extraction failed, but you can still ask general questions about PDFs.",
        filename
    )
}

/// Validates `file`, extracts its text and stores it for `user_id`.
/// Returns the new document's id.
pub async fn upload(
    state: &AppState,
    user_id: Uuid,
    file: Option<UploadedFile>,
) -> Result<Uuid, ApiError> {
    let file = file.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    if file.data.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "File size must be less than {}",
            size_label(state.config.max_upload_bytes)
        )));
    }

    let kind = DocumentKind::from_mime(&file.content_type)
        .ok_or_else(|| ApiError::UnsupportedType("Unsupported file type".to_string()))?;

    let content = extract(state.extractor.clone(), kind, &file).await?;

    let document = state
        .db
        .create_document(user_id, &file.filename, &content)
        .await?;
    info!(
        "Stored document {} ({} chars) for user {}",
        document.id,
        document.content.len(),
        user_id
    );
    Ok(document.id)
}

async fn extract(
    extractor: Arc<dyn TextExtractionService>,
    kind: DocumentKind,
    file: &UploadedFile,
) -> Result<String, ApiError> {
    let data = file.data.clone();
    let outcome: PortResult<String> = tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Pdf => extractor.extract_pdf(&data),
        DocumentKind::Docx => extractor.extract_docx(&data),
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Extraction task failed: {}", e)))?;

    match (kind, outcome) {
        (DocumentKind::Pdf, Ok(text)) if !text.trim().is_empty() => Ok(text),
        (DocumentKind::Pdf, Ok(_)) => {
            warn!("No text found in PDF '{}', storing placeholder", file.filename);
            Ok(pdf_placeholder(&file.filename))
        }
        (DocumentKind::Pdf, Err(e)) => {
            warn!("PDF extraction failed for '{}': {}", file.filename, e);
            Ok(pdf_placeholder(&file.filename))
        }
        (DocumentKind::Docx, Ok(text)) => Ok(text),
        (DocumentKind::Docx, Err(e)) => {
            Err(ApiError::Upstream(format!("Upload failed: {}", e)))
        }
    }
}
