use async_trait::async_trait;
use reqwest::Client;

use super::models::TokenResponse;
use super::{ApiError, Region};

/// Source of bearer credentials for the platform API
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// OAuth client-credentials grant against the regional login service
pub struct ClientCredentials {
    client: Client,
    login_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(region: Region, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::with_login_url(region.login_base_url(), client_id, client_secret)
    }

    /// Use an explicit login service base URL
    pub fn with_login_url(
        login_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            login_url: login_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for ClientCredentials {
    async fn access_token(&self) -> Result<String, ApiError> {
        tracing::debug!("Requesting access token from {}", self.login_url);

        let response = self
            .client
            .post(format!("{}/oauth/token", self.login_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        if let Some(expires_in) = token.expires_in {
            tracing::debug!(
                "Received {} token valid for {}s",
                token.token_type.as_deref().unwrap_or("bearer"),
                expires_in
            );
        }

        Ok(token.access_token)
    }
}
