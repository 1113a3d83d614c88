use super::{
    verify_signature, CreateCustomerRequest, CreateSubscriptionRequest, GatewaySubscription,
    RazorpayEvent, RazorpayService, RazorpayServiceError,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

pub struct LiveRazorpayService {
    http: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
}

#[derive(Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    description: String,
}

impl LiveRazorpayService {
    pub fn new(
        http: Client,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: RAZORPAY_API_BASE.to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn from_settings(http: Client, settings: &crate::config::RazorpaySettings) -> Self {
        Self::new(
            http,
            settings.key_id.clone(),
            settings.key_secret.clone(),
            settings.webhook_secret.clone(),
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, RazorpayServiceError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.description)
                .unwrap_or(text);
            return Err(RazorpayServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| RazorpayServiceError::Serde(e.to_string()))
    }
}

#[async_trait]
impl RazorpayService for LiveRazorpayService {
    async fn create_customer(
        &self,
        req: CreateCustomerRequest,
    ) -> Result<String, RazorpayServiceError> {
        // fail_existing=0 returns the existing customer for a known email
        // instead of a 400, so a retried creation converges on one id.
        let body = json!({
            "name": req.name,
            "email": req.email,
            "contact": req.contact,
            "fail_existing": "0",
            "notes": req.notes,
        });
        let customer: CustomerResponse = self.post("/v1/customers", body).await?;
        Ok(customer.id)
    }

    async fn create_subscription(
        &self,
        req: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, RazorpayServiceError> {
        let body = serde_json::to_value(&req)
            .map_err(|e| RazorpayServiceError::Serde(e.to_string()))?;
        self.post("/v1/subscriptions", body).await
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        event_id: Option<&str>,
    ) -> Result<RazorpayEvent, RazorpayServiceError> {
        verify_signature(&self.webhook_secret, payload, signature_header)?;
        RazorpayEvent::from_body(payload, event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::razorpay::sign_payload;
    use httpmock::prelude::*;
    use std::collections::BTreeMap;

    fn service(server: &MockServer) -> LiveRazorpayService {
        LiveRazorpayService::new(Client::new(), "rzp_key", "rzp_secret", "whsec")
            .with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn create_customer_sends_fail_existing_and_basic_auth() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/customers")
                    .header_exists("authorization")
                    .json_body_partial(r#"{"email":"a@example.com","fail_existing":"0"}"#);
                then.status(200)
                    .json_body(serde_json::json!({"id": "cust_123", "entity": "customer"}));
            })
            .await;

        let id = service(&server)
            .create_customer(CreateCustomerRequest {
                name: "Ada Lovelace".into(),
                email: "a@example.com".into(),
                contact: String::new(),
                notes: BTreeMap::new(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(id, "cust_123");
    }

    #[tokio::test]
    async fn create_subscription_returns_gateway_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/subscriptions")
                    .json_body_partial(r#"{"plan_id":"plan_pro","customer_id":"cust_1","total_count":12}"#);
                then.status(200).json_body(serde_json::json!({
                    "id": "sub_abc",
                    "status": "created",
                    "current_end": null
                }));
            })
            .await;

        let sub = service(&server)
            .create_subscription(CreateSubscriptionRequest {
                plan_id: "plan_pro".into(),
                customer_id: "cust_1".into(),
                quantity: 1,
                total_count: 12,
                notes: BTreeMap::new(),
            })
            .await
            .unwrap();

        assert_eq!(sub.id, "sub_abc");
        assert_eq!(sub.status, "created");
        assert_eq!(sub.current_end, None);
    }

    #[tokio::test]
    async fn api_errors_surface_description() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/subscriptions");
                then.status(400).json_body(serde_json::json!({
                    "error": {"code": "BAD_REQUEST_ERROR", "description": "The id provided does not exist"}
                }));
            })
            .await;

        let err = service(&server)
            .create_subscription(CreateSubscriptionRequest {
                plan_id: "plan_missing".into(),
                customer_id: "cust_1".into(),
                quantity: 1,
                total_count: 12,
                notes: BTreeMap::new(),
            })
            .await
            .unwrap_err();

        match err {
            RazorpayServiceError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "The id provided does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn verify_webhook_checks_signature_before_parsing() {
        let svc = LiveRazorpayService::new(Client::new(), "k", "s", "whsec");
        let body = br#"{"event":"subscription.halted","payload":{}}"#;
        let sig = sign_payload("whsec", body);

        let evt = svc.verify_webhook(body, &sig, Some("evt_9")).unwrap();
        assert_eq!(evt.event, "subscription.halted");
        assert!(svc.verify_webhook(body, "deadbeef", None).is_err());
    }
}
