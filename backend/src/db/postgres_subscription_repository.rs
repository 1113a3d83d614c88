use crate::{
    db::subscription_repository::SubscriptionRepository,
    models::subscription::{
        GatewayStatusUpdate, GatewayUpdateOutcome, Subscription, SubscriptionUpsert,
    },
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresSubscriptionRepository {
    pub pool: PgPool,
}

const SUBSCRIPTION_COLUMNS: &str = r#"
    id,
    user_id,
    razorpay_customer_id,
    razorpay_subscription_id,
    status,
    plan_id,
    plan_name,
    amount,
    currency,
    current_period_end,
    last_event_at,
    created_at,
    updated_at
"#;

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_subscription_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Subscription, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (
                id, user_id, razorpay_customer_id, razorpay_subscription_id, status,
                plan_id, plan_name, amount, currency, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
            ON CONFLICT (user_id) DO UPDATE
            SET current_period_end = CASE
                    WHEN subscriptions.razorpay_subscription_id IS DISTINCT FROM EXCLUDED.razorpay_subscription_id
                    THEN NULL ELSE subscriptions.current_period_end END,
                last_event_at = CASE
                    WHEN subscriptions.razorpay_subscription_id IS DISTINCT FROM EXCLUDED.razorpay_subscription_id
                    THEN NULL ELSE subscriptions.last_event_at END,
                razorpay_customer_id = EXCLUDED.razorpay_customer_id,
                razorpay_subscription_id = EXCLUDED.razorpay_subscription_id,
                status = EXCLUDED.status,
                plan_id = EXCLUDED.plan_id,
                plan_name = EXCLUDED.plan_name,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                updated_at = now()
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(upsert.user_id)
        .bind(&upsert.razorpay_customer_id)
        .bind(&upsert.razorpay_subscription_id)
        .bind(upsert.status)
        .bind(&upsert.plan_id)
        .bind(&upsert.plan_name)
        .bind(upsert.amount)
        .bind(&upsert.currency)
        .fetch_one(&self.pool)
        .await
    }

    async fn apply_gateway_update(
        &self,
        update: &GatewayStatusUpdate,
    ) -> Result<GatewayUpdateOutcome, sqlx::Error> {
        let applied = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            UPDATE subscriptions
            SET status = $2,
                current_period_end = COALESCE($3, current_period_end),
                last_event_at = $4,
                updated_at = now()
            WHERE razorpay_subscription_id = $1
              AND (last_event_at IS NULL OR last_event_at <= $4)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(&update.razorpay_subscription_id)
        .bind(update.status)
        .bind(update.current_period_end)
        .bind(update.event_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(sub) = applied {
            return Ok(GatewayUpdateOutcome::Applied(sub));
        }

        let existing = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE razorpay_subscription_id = $1"
        ))
        .bind(&update.razorpay_subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match existing {
            Some(sub) => GatewayUpdateOutcome::Stale(sub),
            None => GatewayUpdateOutcome::NotFound,
        })
    }
}
