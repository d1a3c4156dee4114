//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, DocumentTextExtractor, HttpMailAdapter, LogMailAdapter, MemoryStore,
        OAuthAdapter, OpenAiAnswerAdapter,
    },
    config::{Config, StoreKind},
    error::ApiError,
    services::tokens::TokenService,
    web::{self, state::AppState},
};
use async_openai::config::OpenAIConfig;
use docchat_core::ports::{DatabaseService, MailService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn connect_store(config: &Config) -> Result<Arc<dyn DatabaseService>, ApiError> {
    match config.store {
        StoreKind::Memory => {
            warn!("Using the in-memory store; all data is lost on restart.");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| ApiError::Internal("DATABASE_URL is required".to_string()))?;
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Ok(Arc::new(db_adapter))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "{},tower_http=debug",
            config.log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Store ---
    let db = connect_store(&config).await?;

    // --- 3. Initialize Service Adapters ---
    let http = reqwest::Client::builder()
        .user_agent("docchat-api")
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let mut openai_config = OpenAIConfig::new().with_api_base(&config.llm_api_base);
    match config.llm_api_key.as_ref() {
        Some(key) => openai_config = openai_config.with_api_key(key),
        None => warn!("LLM_API_KEY is not set; document queries will fail."),
    }
    let answer_adapter = Arc::new(OpenAiAnswerAdapter::new(
        openai_config,
        config.qa_model.clone(),
    ));

    let mailer: Arc<dyn MailService> = match (&config.mail_api_url, &config.mail_api_key) {
        (Some(url), Some(key)) => Arc::new(HttpMailAdapter::new(
            http.clone(),
            url.clone(),
            key.clone(),
            config.sender_email.clone(),
        )),
        _ => {
            warn!("Mail relay is not configured; outgoing email is only logged.");
            Arc::new(LogMailAdapter)
        }
    };

    let identity_provider = Arc::new(OAuthAdapter::new(
        http,
        config.server_uri.clone(),
        config.google.clone(),
        config.github.clone(),
    ));

    let tokens = Arc::new(TokenService::new(
        &config.jwt_secret,
        &config.jwt_refresh_secret,
        config.production,
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db,
        config: config.clone(),
        tokens,
        answer_adapter,
        mailer,
        identity_provider,
        extractor: Arc::new(DocumentTextExtractor),
    });

    // --- 5. Create the Web Router ---
    let app = web::router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
