use crate::db::webhook_event_log_repository::WebhookEventLogRepository;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockWebhookEventLogRepository {
    events: Arc<Mutex<HashSet<(String, String)>>>,
    pub claims: Arc<Mutex<usize>>,
    pub releases: Arc<Mutex<usize>>,
}

impl MockWebhookEventLogRepository {
    pub fn recorded_events(&self) -> Vec<(String, String)> {
        self.events.lock().unwrap().iter().cloned().collect()
    }

    pub fn claim_count(&self) -> usize {
        *self.claims.lock().unwrap()
    }
}

#[async_trait]
impl WebhookEventLogRepository for MockWebhookEventLogRepository {
    async fn claim_event(&self, source: &str, event_id: &str) -> Result<bool, sqlx::Error> {
        *self.claims.lock().unwrap() += 1;
        Ok(self
            .events
            .lock()
            .unwrap()
            .insert((source.to_string(), event_id.to_string())))
    }

    async fn release_event(&self, source: &str, event_id: &str) -> Result<(), sqlx::Error> {
        *self.releases.lock().unwrap() += 1;
        self.events
            .lock()
            .unwrap()
            .remove(&(source.to_string(), event_id.to_string()));
        Ok(())
    }
}
