//! crates/docchat_core/src/conversation.rs
//!
//! Prompt assembly for document questions: a bounded window of recent turns
//! plus the full document text and fixed formatting instructions.

use crate::domain::{ChatMessage, Document};

/// Number of most recent messages (including the new question) sent to the model.
pub const HISTORY_WINDOW: usize = 6;

/// Soft answer returned when the caller has no document with the requested id.
pub const DOCUMENT_NOT_FOUND_ANSWER: &str = "Document not found.";

const FORMATTING_INSTRUCTIONS: &str = "IMPORTANT: Format your response with:
- Use **bold** for important points
- Use `code` for technical terms, variables, functions
- Use triple backticks for multi-line code blocks, examples, or structured data
- Use numbered lists for steps
- Use bullet points for features
- Use line breaks for better readability
- Highlight key information with proper formatting
- Structure your answer in sections when appropriate";

/// The tail of `messages` that fits in the context window. Older turns are dropped.
pub fn history_window(messages: &[ChatMessage]) -> &[ChatMessage] {
    let start = messages.len().saturating_sub(HISTORY_WINDOW);
    &messages[start..]
}

/// Renders messages as `role: content` lines.
pub fn render_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the single prompt sent to the model for one question. `messages` is
/// the full conversation after the new question was appended.
pub fn build_prompt(document: &Document, messages: &[ChatMessage]) -> String {
    let history = render_history(history_window(messages));
    format!(
        "You are a helpful assistant that formats responses in a structured, readable way. \
Answer based on the document content and conversation history.

Document: {filename}
Content: {content}

Conversation History:
{history}

{instructions}

Provide a detailed, well-formatted answer based on the document content:",
        filename = document.filename,
        content = document.content,
        history = history,
        instructions = FORMATTING_INSTRUCTIONS,
    )
}
