//! services/api/src/adapters/answer_llm.rs
//!
//! This module contains the adapter for the document question-answering model.
//! It implements the `AnswerGenerationService` port from the `core` crate against
//! any OpenAI-compatible chat completion endpoint (Gemini's included).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use docchat_core::ports::{AnswerGenerationService, PortError, PortResult};
use std::time::Duration;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnswerGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnswerAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

/// A policy whose elapsed-time budget is spent by the first attempt, so a
/// failed call is reported instead of retried.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

impl OpenAiAnswerAdapter {
    /// Creates a new `OpenAiAnswerAdapter`. Each question costs exactly one
    /// request; the client's default retry-on-5xx/429 is switched off.
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        let client = Client::with_config(config).with_backoff(single_attempt());
        Self { client, model }
    }
}

//=========================================================================================
// `AnswerGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnswerGenerationService for OpenAiAnswerAdapter {
    /// The prompt already carries the document, history and formatting rules, so
    /// it is sent as a single user turn.
    async fn generate_answer(&self, prompt: &str) -> PortResult<String> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PortError::Unexpected("Model returned no answer".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn adapter(server: &MockServer) -> OpenAiAnswerAdapter {
        let config = OpenAIConfig::new()
            .with_api_key("test-key")
            .with_api_base(server.uri());
        OpenAiAnswerAdapter::new(config, "gemini-1.5-flash".to_string())
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "gemini-1.5-flash",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "**42**" },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = adapter(&server).generate_answer("What is it?").await.unwrap();
        assert_eq!(answer, "**42**");
    }

    #[tokio::test]
    async fn provider_error_becomes_port_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "bad key", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = adapter(&server).generate_answer("q").await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }

    #[tokio::test]
    async fn unavailable_model_is_called_once_and_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "message": "overloaded", "type": "server_error" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            adapter(&server).generate_answer("q"),
        )
        .await
        .expect("a failed model call must not be retried");
        assert!(matches!(outcome, Err(PortError::Unexpected(_))));
    }
}
