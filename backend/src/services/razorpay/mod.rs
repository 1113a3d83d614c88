// Razorpay has no maintained async Rust SDK; the live client talks to the REST
// API directly with reqwest. Only the endpoints the subscription lifecycle
// needs are wrapped here.
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum RazorpayServiceError {
    #[error("razorpay api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("webhook verification failed: {0}")]
    Webhook(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

impl From<reqwest::Error> for RazorpayServiceError {
    fn from(err: reqwest::Error) -> Self {
        RazorpayServiceError::Http(err.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: String,
    pub contact: String,
    pub notes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateSubscriptionRequest {
    pub plan_id: String,
    pub customer_id: String,
    pub quantity: u32,
    pub total_count: u32,
    pub notes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GatewaySubscription {
    pub id: String,
    pub status: String,
    /// Unix seconds; absent until the first charge.
    #[serde(default)]
    pub current_end: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RazorpayEvent {
    /// From the `X-Razorpay-Event-Id` header; absent on older deliveries.
    pub id: Option<String>,
    pub event: String,
    pub created_at: Option<i64>,
    pub payload: serde_json::Value,
}

impl RazorpayEvent {
    pub fn from_body(body: &[u8], event_id: Option<&str>) -> Result<Self, RazorpayServiceError> {
        let val: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| RazorpayServiceError::Serde(e.to_string()))?;
        let event = val
            .get("event")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RazorpayServiceError::Serde("missing event type".into()))?
            .to_string();
        let created_at = val.get("created_at").and_then(|v| v.as_i64());
        let payload = val
            .get("payload")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        Ok(RazorpayEvent {
            id: event_id.map(str::to_string),
            event,
            created_at,
            payload,
        })
    }

    /// The subscription entity carried by `subscription.*` events.
    pub fn subscription_entity(&self) -> Option<GatewaySubscription> {
        let entity = self.payload.get("subscription")?.get("entity")?;
        serde_json::from_value(entity.clone()).ok()
    }
}

#[async_trait]
pub trait RazorpayService: Send + Sync {
    async fn create_customer(
        &self,
        req: CreateCustomerRequest,
    ) -> Result<String, RazorpayServiceError>;

    async fn create_subscription(
        &self,
        req: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, RazorpayServiceError>;

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        event_id: Option<&str>,
    ) -> Result<RazorpayEvent, RazorpayServiceError>;
}

/// Hex HMAC-SHA256 of the raw body, compared in constant time.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
) -> Result<(), RazorpayServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| RazorpayServiceError::Webhook(e.to_string()))?;
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());
    let provided = signature_header.trim();

    if expected.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(RazorpayServiceError::Webhook("signature mismatch".into()))
    }
}

#[cfg(test)]
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

mod live;
mod mock;

pub use live::LiveRazorpayService;
pub use mock::MockRazorpayService;
