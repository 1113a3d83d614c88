use crate::db::webhook_event_log_repository::WebhookEventLogRepository;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

pub struct PostgresWebhookEventLogRepository {
    pub pool: PgPool,
}

#[async_trait]
impl WebhookEventLogRepository for PostgresWebhookEventLogRepository {
    async fn claim_event(&self, source: &str, event_id: &str) -> Result<bool, sqlx::Error> {
        let inserted = sqlx::query_scalar::<Postgres, String>(
            r#"
            INSERT INTO webhook_event_log (source, event_id)
            VALUES ($1, $2)
            ON CONFLICT (source, event_id) DO NOTHING
            RETURNING event_id
            "#,
        )
        .bind(source)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    async fn release_event(&self, source: &str, event_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query::<Postgres>("DELETE FROM webhook_event_log WHERE source = $1 AND event_id = $2")
            .bind(source)
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
