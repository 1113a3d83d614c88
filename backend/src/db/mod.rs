pub mod mock_db;
pub mod mock_webhook_event_log_repository;
pub mod postgres_subscription_repository;
pub mod postgres_user_repository;
pub mod postgres_webhook_event_log_repository;
pub mod subscription_repository;
pub mod user_repository;
pub mod webhook_event_log_repository;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Opens the pool and checks the connection with a trivial query.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
