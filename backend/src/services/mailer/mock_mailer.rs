use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::{EmailMessage, MailError, Mailer};

/// Records every message it is asked to send.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub sent_emails: Mutex<Vec<EmailMessage>>,
    pub attempted: Mutex<usize>,
    pub fail_send: bool,
}

impl MockMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent_emails.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempted.lock().unwrap()
    }

    /// Polls until `count` sends were attempted; notifications run detached.
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.attempts() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), MailError> {
        *self.attempted.lock().unwrap() += 1;
        if self.fail_send {
            return Err(MailError::SendError("mock failure".into()));
        }
        self.sent_emails.lock().unwrap().push(message.clone());
        Ok(())
    }
}
