use async_trait::async_trait;
use uuid::Uuid;

use crate::models::subscription::{
    GatewayStatusUpdate, GatewayUpdateOutcome, Subscription, SubscriptionUpsert,
};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_subscription_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error>;

    /// Create-or-update keyed by `user_id`; the row id survives updates.
    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Subscription, sqlx::Error>;

    /// Applies a gateway-reported status unless the row already reflects a
    /// newer gateway event.
    async fn apply_gateway_update(
        &self,
        update: &GatewayStatusUpdate,
    ) -> Result<GatewayUpdateOutcome, sqlx::Error>;
}
