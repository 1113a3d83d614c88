use async_trait::async_trait;

#[async_trait]
pub trait WebhookEventLogRepository: Send + Sync {
    /// Atomically records `(source, event_id)`. Returns `false` when the id was
    /// already claimed by an earlier or concurrent delivery.
    async fn claim_event(&self, source: &str, event_id: &str) -> Result<bool, sqlx::Error>;

    /// Drops a claim so a failed delivery can be retried by the sender.
    async fn release_event(&self, source: &str, event_id: &str) -> Result<(), sqlx::Error>;
}
