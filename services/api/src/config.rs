//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which persistence backend the server runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

/// Client credentials for one OAuth provider.
#[derive(Clone, Debug)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub log_level: Level,
    /// Production mode marks cookies `Secure` and `SameSite=None`.
    pub production: bool,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub client_url: String,
    pub server_uri: String,
    pub llm_api_key: Option<String>,
    pub llm_api_base: String,
    pub qa_model: String,
    pub google: Option<OAuthClientConfig>,
    pub github: Option<OAuthClientConfig>,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub sender_email: String,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:4000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let store = match std::env::var("STORE")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StoreKind::Postgres,
            "memory" => StoreKind::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE".to_string(),
                    format!("'{}' is not one of postgres, memory", other),
                ))
            }
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let production = std::env::var("APP_ENV")
            .or_else(|_| std::env::var("NODE_ENV"))
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        // --- Load Token Secrets ---
        let jwt_secret = std::env::var("JWT_SECRET_KEY")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET_KEY".to_string()))?;
        let jwt_refresh_secret = std::env::var("JWT_REFRESH_SECRET_KEY")
            .map_err(|_| ConfigError::MissingVar("JWT_REFRESH_SECRET_KEY".to_string()))?;

        let client_url =
            std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let server_uri =
            std::env::var("SERVER_URI").unwrap_or_else(|_| "http://localhost:4000".to_string());

        // --- Load Model Settings ---
        let llm_api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok();
        let llm_api_base = std::env::var("LLM_API_BASE").unwrap_or_else(|_| {
            "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
        });
        let qa_model =
            std::env::var("QA_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        // --- Load OAuth Providers (as optional) ---
        let google = oauth_client("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET");
        let github = oauth_client("GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET");

        // --- Load Mail Settings ---
        let mail_api_url = std::env::var("MAIL_API_URL").ok();
        let mail_api_key = std::env::var("MAIL_API_KEY").ok();
        let sender_email =
            std::env::var("SENDER_EMAIL").unwrap_or_else(|_| "no-reply@localhost".to_string());

        let max_upload_bytes = match std::env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("MAX_UPLOAD_BYTES".to_string(), e.to_string())
            })?,
            Err(_) => 5 * 1024 * 1024,
        };

        Ok(Self {
            bind_address,
            store,
            database_url,
            log_level,
            production,
            jwt_secret,
            jwt_refresh_secret,
            client_url,
            server_uri,
            llm_api_key,
            llm_api_base,
            qa_model,
            google,
            github,
            mail_api_url,
            mail_api_key,
            sender_email,
            max_upload_bytes,
        })
    }
}

fn oauth_client(id_var: &str, secret_var: &str) -> Option<OAuthClientConfig> {
    match (std::env::var(id_var), std::env::var(secret_var)) {
        (Ok(client_id), Ok(client_secret)) => Some(OAuthClientConfig {
            client_id,
            client_secret,
        }),
        _ => None,
    }
}
