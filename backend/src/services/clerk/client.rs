use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{errors::ClerkError, models::ClerkUserData, service::ClerkService};

const CLERK_API_BASE: &str = "https://api.clerk.com";

/// Clerk Backend API client, authenticated with the instance secret key.
pub struct LiveClerkClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl LiveClerkClient {
    pub fn new(http: Client, secret_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: CLERK_API_BASE.to_string(),
            secret_key: secret_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ClerkService for LiveClerkClient {
    async fn get_user(&self, clerk_id: &str) -> Result<ClerkUserData, ClerkError> {
        let res = self
            .http
            .get(format!("{}/v1/users/{}", self.base_url, clerk_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        match res.status() {
            s if s.is_success() => Ok(res.json::<ClerkUserData>().await?),
            StatusCode::NOT_FOUND => Err(ClerkError::UserNotFound),
            s => {
                let message = res.text().await.unwrap_or_default();
                Err(ClerkError::Api {
                    status: s.as_u16(),
                    message,
                })
            }
        }
    }
}
