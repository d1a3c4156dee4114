//! services/api/src/adapters/oauth.rs
//!
//! Authorization-code flow against Google and GitHub. Implements the
//! `IdentityProviderService` port: build the consent URL, then exchange the
//! returned code for an access token and read the caller's profile.

use async_trait::async_trait;
use docchat_core::{
    ports::{IdentityProviderService, PortError, PortResult},
    AuthProvider, FederatedProfile,
};
use reqwest::{header::ACCEPT, Url};
use serde::Deserialize;
use tracing::{error, info};

use crate::config::OAuthClientConfig;

/// Where one provider's OAuth endpoints live.
#[derive(Clone, Debug)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub profile_url: String,
    /// GitHub only: the list of the account's email addresses.
    pub emails_url: Option<String>,
}

impl ProviderEndpoints {
    pub fn google() -> Self {
        Self {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            profile_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            emails_url: None,
        }
    }

    pub fn github() -> Self {
        Self {
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            profile_url: "https://api.github.com/user".to_string(),
            emails_url: Some("https://api.github.com/user/emails".to_string()),
        }
    }
}

#[derive(Clone)]
struct ProviderClient {
    credentials: OAuthClientConfig,
    endpoints: ProviderEndpoints,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleProfile {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    email: String,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Deserialize)]
struct GithubProfile {
    id: u64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct OAuthAdapter {
    http: reqwest::Client,
    server_uri: String,
    google: Option<ProviderClient>,
    github: Option<ProviderClient>,
}

impl OAuthAdapter {
    /// Providers without credentials are reported as unavailable.
    pub fn new(
        http: reqwest::Client,
        server_uri: String,
        google: Option<OAuthClientConfig>,
        github: Option<OAuthClientConfig>,
    ) -> Self {
        Self {
            http,
            server_uri,
            google: google.map(|credentials| ProviderClient {
                credentials,
                endpoints: ProviderEndpoints::google(),
            }),
            github: github.map(|credentials| ProviderClient {
                credentials,
                endpoints: ProviderEndpoints::github(),
            }),
        }
    }

    /// Points one provider at different endpoints.
    pub fn with_endpoints(mut self, provider: AuthProvider, endpoints: ProviderEndpoints) -> Self {
        let slot = match provider {
            AuthProvider::Google => &mut self.google,
            AuthProvider::Github => &mut self.github,
            AuthProvider::Credentials => return self,
        };
        if let Some(client) = slot.as_mut() {
            client.endpoints = endpoints;
        }
        self
    }

    fn client(&self, provider: AuthProvider) -> PortResult<&ProviderClient> {
        let slot = match provider {
            AuthProvider::Google => self.google.as_ref(),
            AuthProvider::Github => self.github.as_ref(),
            AuthProvider::Credentials => None,
        };
        slot.ok_or_else(|| {
            PortError::Unexpected(format!("OAuth provider {} is not configured", provider))
        })
    }

    fn redirect_uri(&self, provider: AuthProvider) -> String {
        format!("{}/api/auth/{}/callback", self.server_uri, provider.as_str())
    }

    async fn exchange_code(
        &self,
        provider: AuthProvider,
        client: &ProviderClient,
        code: &str,
    ) -> PortResult<String> {
        let redirect_uri = self.redirect_uri(provider);
        let params = [
            ("code", code),
            ("client_id", client.credentials.client_id.as_str()),
            ("client_secret", client.credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&client.endpoints.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!("{} token exchange failed: {} - {}", provider, status, detail);
            return Err(PortError::Unexpected(format!(
                "Token exchange failed with {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to parse token response: {}", e)))?;
        Ok(token.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> PortResult<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Profile request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Profile request to {} returned {}",
                url,
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to parse profile: {}", e)))
    }
}

//=========================================================================================
// `IdentityProviderService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProviderService for OAuthAdapter {
    fn authorize_url(&self, provider: AuthProvider) -> PortResult<String> {
        let client = self.client(provider)?;
        let redirect_uri = self.redirect_uri(provider);
        let client_id = client.credentials.client_id.as_str();

        let params: Vec<(&str, &str)> = match provider {
            AuthProvider::Google => vec![
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", client_id),
                ("access_type", "offline"),
                ("response_type", "code"),
                ("prompt", "consent"),
                (
                    "scope",
                    "https://www.googleapis.com/auth/userinfo.profile https://www.googleapis.com/auth/userinfo.email",
                ),
            ],
            _ => vec![
                ("client_id", client_id),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", "read:user user:email"),
            ],
        };

        Url::parse_with_params(&client.endpoints.authorize_url, &params)
            .map(String::from)
            .map_err(|e| PortError::Unexpected(format!("Invalid authorize URL: {}", e)))
    }

    async fn fetch_profile(
        &self,
        provider: AuthProvider,
        code: &str,
    ) -> PortResult<FederatedProfile> {
        let client = self.client(provider)?;
        let access_token = self.exchange_code(provider, client, code).await?;

        let profile = match provider {
            AuthProvider::Google => {
                let google: GoogleProfile = self
                    .get_json(&client.endpoints.profile_url, &access_token)
                    .await?;
                FederatedProfile {
                    provider,
                    provider_id: google.sub,
                    name: google.name.unwrap_or_else(|| google.email.clone()),
                    email: google.email.trim().to_lowercase(),
                    photo: google.picture,
                }
            }
            _ => {
                let github: GithubProfile = self
                    .get_json(&client.endpoints.profile_url, &access_token)
                    .await?;
                let emails_url = client.endpoints.emails_url.as_deref().ok_or_else(|| {
                    PortError::Unexpected("GitHub emails endpoint missing".to_string())
                })?;
                let emails: Vec<GithubEmail> = self.get_json(emails_url, &access_token).await?;
                let primary = emails
                    .into_iter()
                    .find(|e| e.primary && e.verified)
                    .ok_or(PortError::EmailNotVerified)?;

                FederatedProfile {
                    provider,
                    provider_id: github.id.to_string(),
                    name: github.name.filter(|n| !n.is_empty()).unwrap_or(github.login),
                    email: primary.email.trim().to_lowercase(),
                    photo: github.avatar_url,
                }
            }
        };

        info!("Fetched {} profile {}", provider, profile.provider_id);
        Ok(profile)
    }
}
