use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{EmailMessage, MailError, Mailer};
use crate::config::EmailSettings;

const RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Clone)]
pub struct ResendMailer {
    api_key: String,
    from: String,
    base_url: String,
    http: Client,
}

impl ResendMailer {
    pub fn new(http: &Client, settings: &EmailSettings) -> Self {
        Self {
            api_key: settings.resend_api_key.clone(),
            from: settings.from.clone(),
            base_url: RESEND_API_BASE.to_string(),
            http: http.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), MailError> {
        let payload = json!({
            "from": self.from,
            "to": [message.to],
            "subject": message.subject,
            "html": message.html,
        });

        let resp = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(MailError::SendError(format!(
                "Resend send failed: {} {}",
                status, text
            )))
        }
    }
}
