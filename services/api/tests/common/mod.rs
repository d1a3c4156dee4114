//! Shared harness for the router tests: an in-memory store, scripted
//! collaborators and a small request helper.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use api_lib::{
    adapters::MemoryStore,
    config::{Config, StoreKind},
    services::tokens::TokenService,
    web::{self, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use docchat_core::{
    ports::{
        AnswerGenerationService, IdentityProviderService, MailService, PortError, PortResult,
        TextExtractionService,
    },
    AuthProvider, FederatedProfile, OutgoingEmail,
};
use regex::Regex;
use serde_json::Value;
use tower::ServiceExt;

pub const CLIENT_URL: &str = "http://localhost:5173";
pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// Uploads starting with this marker make the fake extractor fail.
pub const BROKEN: &[u8] = b"%BROKEN";

pub fn test_config() -> Config {
    Config {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        store: StoreKind::Memory,
        database_url: None,
        log_level: tracing::Level::INFO,
        production: false,
        jwt_secret: "test-access-secret".to_string(),
        jwt_refresh_secret: "test-refresh-secret".to_string(),
        client_url: CLIENT_URL.to_string(),
        server_uri: "http://localhost:4000".to_string(),
        llm_api_key: None,
        llm_api_base: "http://127.0.0.1:9".to_string(),
        qa_model: "test-model".to_string(),
        google: None,
        github: None,
        mail_api_url: None,
        mail_api_key: None,
        sender_email: "no-reply@docchat.test".to_string(),
        max_upload_bytes: 5 * 1024 * 1024,
    }
}

//=========================================================================================
// Scripted collaborators
//=========================================================================================

/// Records every prompt and answers `answer <n>`.
#[derive(Default)]
pub struct RecordingModel {
    prompts: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl RecordingModel {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerationService for RecordingModel {
    async fn generate_answer(&self, prompt: &str) -> PortResult<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("model unavailable".to_string()));
        }
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        Ok(format!("answer {}", prompts.len()))
    }
}

#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: AtomicBool,
}

impl CapturingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// The six-digit code in the most recent message to `to`.
    pub fn last_code_for(&self, to: &str) -> String {
        let pattern = Regex::new(r"\b(\d{6})\b").unwrap();
        let sent = self.sent.lock().unwrap();
        let message = sent.iter().rev().find(|m| m.to == to).expect("no mail sent");
        let text = message.text.clone().unwrap_or_default();
        pattern.captures(&text).expect("no code in mail")[1].to_string()
    }
}

#[async_trait]
impl MailService for CapturingMailer {
    async fn send(&self, email: OutgoingEmail) -> PortResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("relay down".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub enum ProviderOutcome {
    Profile(FederatedProfile),
    EmailNotVerified,
    Fail,
}

#[derive(Default)]
pub struct FakeIdentityProvider {
    outcomes: Mutex<HashMap<AuthProvider, ProviderOutcome>>,
}

impl FakeIdentityProvider {
    pub fn set(&self, provider: AuthProvider, outcome: ProviderOutcome) {
        self.outcomes.lock().unwrap().insert(provider, outcome);
    }
}

#[async_trait]
impl IdentityProviderService for FakeIdentityProvider {
    fn authorize_url(&self, provider: AuthProvider) -> PortResult<String> {
        Ok(format!("https://{}.provider.test/authorize?client_id=cid", provider))
    }

    async fn fetch_profile(
        &self,
        provider: AuthProvider,
        _code: &str,
    ) -> PortResult<FederatedProfile> {
        match self.outcomes.lock().unwrap().get(&provider) {
            Some(ProviderOutcome::Profile(profile)) => Ok(profile.clone()),
            Some(ProviderOutcome::EmailNotVerified) => Err(PortError::EmailNotVerified),
            Some(ProviderOutcome::Fail) | None => {
                Err(PortError::Unexpected("token exchange failed".to_string()))
            }
        }
    }
}

/// Treats upload bytes as the document text.
pub struct FakeExtractor;

impl TextExtractionService for FakeExtractor {
    fn extract_pdf(&self, data: &[u8]) -> PortResult<String> {
        if data.starts_with(BROKEN) {
            return Err(PortError::Unexpected("unreadable PDF".to_string()));
        }
        Ok(String::from_utf8_lossy(data).into_owned())
    }

    fn extract_docx(&self, data: &[u8]) -> PortResult<String> {
        if data.starts_with(BROKEN) {
            return Err(PortError::Unexpected("unreadable DOCX".to_string()));
        }
        Ok(String::from_utf8_lossy(data).into_owned())
    }
}

//=========================================================================================
// The app under test
//=========================================================================================

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `refreshToken=<value>` as a browser would send it back.
    pub fn refresh_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("refreshToken="))
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub model: Arc<RecordingModel>,
    pub mailer: Arc<CapturingMailer>,
    pub identity: Arc<FakeIdentityProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let model = Arc::new(RecordingModel::default());
        let mailer = Arc::new(CapturingMailer::default());
        let identity = Arc::new(FakeIdentityProvider::default());
        let state = Arc::new(AppState {
            db: Arc::new(MemoryStore::new()),
            tokens: Arc::new(TokenService::new(
                &config.jwt_secret,
                &config.jwt_refresh_secret,
                config.production,
            )),
            config: Arc::new(config),
            answer_adapter: model.clone(),
            mailer: mailer.clone(),
            identity_provider: identity.clone(),
            extractor: Arc::new(FakeExtractor),
        });
        Self {
            router: web::router(state.clone()),
            state,
            model,
            mailer,
            identity,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn with_cookie(&self, method: Method, uri: &str, cookie: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Registers an account and returns (access token, refresh cookie).
    pub async fn register(&self, name: &str, email: &str, password: &str) -> (String, String) {
        let response = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({ "name": name, "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        let token = response.body["accessToken"].as_str().unwrap().to_string();
        (token, response.refresh_cookie().unwrap())
    }

    pub async fn upload(
        &self,
        token: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> TestResponse {
        let boundary = "docchat-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{f}\"\r\nContent-Type: {t}\r\n\r\n",
                b = boundary,
                f = filename,
                t = content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/documents/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn query(&self, token: &str, document_id: &str, question: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/api/documents/query",
            Some(token),
            Some(serde_json::json!({ "question": question, "documentId": document_id })),
        )
        .await
    }
}
