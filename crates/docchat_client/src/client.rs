//! crates/docchat_client/src/client.rs
//!
//! The request abstraction and its refresh-and-retry interceptor.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Method, StatusCode,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::session::SessionState;

/// Value of the `error` field that marks an expired access token.
pub const TOKEN_EXPIRED_MARKER: &str = "TOKEN_EXPIRED";
const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Session expired and could not be refreshed (status {0})")]
    RefreshFailed(StatusCode),
}

/// One file part of a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name, e.g. `document`.
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Rebuilt into a fresh multipart form on every send, so a retried upload
    /// carries the same file.
    Multipart(Vec<FilePart>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative to the API base, e.g. `/documents/query`.
    pub path: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: RequestBody::Json(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    /// `POST /documents/upload` with the file in the `document` part.
    pub fn upload_document(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            method: Method::POST,
            path: "/documents/upload".to_string(),
            body: RequestBody::Multipart(vec![FilePart {
                field: "document".to_string(),
                filename: filename.into(),
                content_type: content_type.into(),
                data,
            }]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    fn is_token_expired(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
            && self.body.get("error").and_then(Value::as_str) == Some(TOKEN_EXPIRED_MARKER)
    }

    fn access_token(&self) -> Option<&str> {
        self.body.get("accessToken").and_then(Value::as_str)
    }
}

//=========================================================================================
// Transport port
//=========================================================================================

/// Sends one request. Implementations must carry cookies across calls so the
/// refresh cookie set at login reaches `/auth/refresh`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, ClientError>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// `base_url` includes the `/api` prefix.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

fn multipart_form(parts: &[FilePart]) -> Result<Form, ClientError> {
    parts.iter().try_fold(Form::new(), |form, part| {
        let file = Part::bytes(part.data.clone())
            .file_name(part.filename.clone())
            .mime_str(&part.content_type)
            .map_err(|e| ClientError::Transport(format!("Invalid content type: {}", e)))?;
        Ok(form.part(part.field.clone(), file))
    })
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        match &request.body {
            RequestBody::Empty => {}
            RequestBody::Json(body) => builder = builder.json(body),
            RequestBody::Multipart(parts) => builder = builder.multipart(multipart_form(parts)?),
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        // Non-JSON bodies (e.g. plain-text rejections) surface as a string.
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        Ok(ApiResponse { status, body })
    }
}

//=========================================================================================
// The interceptor
//=========================================================================================

pub struct ApiClient<T: Transport> {
    transport: T,
    session: Arc<SessionState>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, session: Arc<SessionState>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Sends `request` with the current access token. On an expired-token
    /// rejection it refreshes once and re-sends once; the second response is
    /// returned whatever it is. A failed refresh ends the session.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let token = self.session.access_token().await;
        let response = self.transport.send(&request, token.as_deref()).await?;
        if !response.is_token_expired() {
            return Ok(response);
        }

        info!("Access token expired; refreshing before retrying {}", request.path);
        let fresh = self.refresh().await?;
        self.transport.send(&request, Some(&fresh)).await
    }

    async fn refresh(&self) -> Result<String, ClientError> {
        let refresh = ApiRequest {
            method: Method::POST,
            path: REFRESH_PATH.to_string(),
            body: RequestBody::Empty,
        };
        let outcome = self.transport.send(&refresh, None).await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.session.expire().await;
                return Err(e);
            }
        };
        match (response.status.is_success(), response.access_token()) {
            (true, Some(token)) => {
                let token = token.to_string();
                self.session.set_access_token(token.clone()).await;
                Ok(token)
            }
            _ => {
                warn!("Refresh rejected with {}", response.status);
                self.session.expire().await;
                Err(ClientError::RefreshFailed(response.status))
            }
        }
    }

    //=====================================================================================
    // Credential helpers
    //=====================================================================================

    /// Signs in and keeps the returned access token. The refresh cookie is kept
    /// by the transport.
    pub async fn login(&self, email: &str, password: &str) -> Result<ApiResponse, ClientError> {
        let response = self
            .transport
            .send(
                &ApiRequest::post("/auth/login", json!({ "email": email, "password": password })),
                None,
            )
            .await?;
        if let (true, Some(token)) = (response.status.is_success(), response.access_token()) {
            self.session.set_access_token(token).await;
        }
        Ok(response)
    }

    pub async fn logout(&self) -> Result<ApiResponse, ClientError> {
        let response = self
            .transport
            .send(&ApiRequest::post("/auth/logout", json!({})), None)
            .await;
        self.session.clear().await;
        response
    }
}
