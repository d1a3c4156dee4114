//! crates/docchat_client/src/session.rs
//!
//! The client's view of the signed-in session. Passed explicitly to whoever
//! sends requests; there is no process-wide token.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

type LogoutCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct SessionState {
    access_token: RwLock<Option<String>>,
    on_logout: RwLock<Option<LogoutCallback>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    pub async fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().await = Some(token.into());
    }

    pub async fn is_authenticated(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    /// Registers the hook run when the session ends because a refresh failed.
    pub async fn on_logout(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.on_logout.write().await = Some(Arc::new(callback));
    }

    /// Drops the token without notifying anyone. Used for a user-initiated logout.
    pub async fn clear(&self) {
        *self.access_token.write().await = None;
    }

    /// Drops the token and runs the logout hook.
    pub async fn expire(&self) {
        self.clear().await;
        let callback = self.on_logout.read().await.clone();
        if let Some(callback) = callback {
            info!("Session expired; running logout hook");
            callback();
        }
    }
}
