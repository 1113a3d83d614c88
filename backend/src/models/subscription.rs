use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "TRIALING",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::PastDue => "PAST_DUE",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    /// Maps a Razorpay subscription status onto the local lifecycle.
    pub fn from_gateway(status: &str) -> Option<Self> {
        match status {
            "created" | "authenticated" => Some(SubscriptionStatus::Trialing),
            "active" => Some(SubscriptionStatus::Active),
            "pending" | "halted" | "paused" => Some(SubscriptionStatus::PastDue),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            "completed" | "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub razorpay_customer_id: Option<String>,
    pub razorpay_subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub plan_id: String,
    pub plan_name: String,
    /// Major currency units (rupees, not paise).
    pub amount: f64,
    pub currency: String,
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub last_event_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.current_period_end.is_some_and(|end| end < now)
    }

    pub fn grants_access(&self, now: DateTime<Utc>) -> bool {
        self.status.is_entitled() && !self.is_expired(now)
    }
}

/// Values written by the subscription-creation flow. Keyed by `user_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpsert {
    pub user_id: Uuid,
    pub razorpay_customer_id: String,
    pub razorpay_subscription_id: String,
    pub status: SubscriptionStatus,
    pub plan_id: String,
    pub plan_name: String,
    pub amount: f64,
    pub currency: String,
}

/// A status change reported by the billing gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayStatusUpdate {
    pub razorpay_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub event_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum GatewayUpdateOutcome {
    Applied(Subscription),
    Stale(Subscription),
    NotFound,
}
