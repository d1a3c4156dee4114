//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::{config::Config, services::tokens::TokenService};
use docchat_core::ports::{
    AnswerGenerationService, DatabaseService, IdentityProviderService, MailService,
    TextExtractionService,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub answer_adapter: Arc<dyn AnswerGenerationService>,
    pub mailer: Arc<dyn MailService>,
    pub identity_provider: Arc<dyn IdentityProviderService>,
    pub extractor: Arc<dyn TextExtractionService>,
}
