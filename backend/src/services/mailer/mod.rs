use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub mod mock_mailer;
pub mod resend_mailer;
pub mod templates;

pub use mock_mailer::MockMailer;
pub use resend_mailer::ResendMailer;
pub use templates::{render_email_html, EmailTemplate};

#[derive(Debug)]
pub enum MailError {
    InvalidEmailAddress(String),
    SendError(String),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::InvalidEmailAddress(e) => write!(f, "Invalid Address: {}", e),
            MailError::SendError(e) => write!(f, "Send error: {}", e),
        }
    }
}

impl std::error::Error for MailError {}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Renders `template` with `data` and hands it to the mailer. The result is
/// informational; callers on the request path usually ignore it.
pub async fn send_templated(
    mailer: &dyn Mailer,
    to: &str,
    subject: &str,
    template: &str,
    data: &Map<String, Value>,
) -> Result<(), MailError> {
    if !to.contains('@') {
        return Err(MailError::InvalidEmailAddress(to.to_string()));
    }
    let message = EmailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        html: render_email_html(template, data),
    };
    mailer.send_email(&message).await
}

/// Sends a templated e-mail on a detached task. Failures are logged and
/// never reach the caller.
pub fn spawn_notification(
    mailer: Arc<dyn Mailer>,
    to: String,
    subject: String,
    template: EmailTemplate,
    data: Map<String, Value>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match send_templated(mailer.as_ref(), &to, &subject, template.key(), &data).await {
            Ok(()) => tracing::info!(template = template.key(), "notification sent"),
            Err(err) => tracing::warn!(
                %err,
                template = template.key(),
                "notification failed to send"
            ),
        }
    })
}
