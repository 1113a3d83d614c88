use super::{
    CreateCustomerRequest, CreateSubscriptionRequest, GatewaySubscription, RazorpayEvent,
    RazorpayService, RazorpayServiceError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every gateway call. Customer ids are stable per email, the way the
/// live API behaves with `fail_existing=0`.
#[derive(Clone, Default)]
pub struct MockRazorpayService {
    pub customer_requests: Arc<Mutex<Vec<CreateCustomerRequest>>>,
    pub subscription_requests: Arc<Mutex<Vec<CreateSubscriptionRequest>>>,
    pub(crate) customers_by_email: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) next_id: Arc<AtomicUsize>,
    pub fail_customer: bool,
    pub fail_subscription: bool,
    pub reject_signatures: bool,
    /// Gateway status echoed back from `create_subscription`.
    pub subscription_status: Option<String>,
    /// Artificial latency on customer creation, for exercising races.
    pub customer_delay: Option<Duration>,
}

impl MockRazorpayService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer_calls(&self) -> usize {
        self.customer_requests.lock().unwrap().len()
    }

    pub fn subscription_calls(&self) -> usize {
        self.subscription_requests.lock().unwrap().len()
    }

    pub fn total_calls(&self) -> usize {
        self.customer_calls() + self.subscription_calls()
    }

    fn make_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_test_{n}")
    }
}

#[async_trait]
impl RazorpayService for MockRazorpayService {
    async fn create_customer(
        &self,
        req: CreateCustomerRequest,
    ) -> Result<String, RazorpayServiceError> {
        self.customer_requests.lock().unwrap().push(req.clone());
        if let Some(delay) = self.customer_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_customer {
            return Err(RazorpayServiceError::Api {
                status: 500,
                message: "mock customer failure".into(),
            });
        }

        let mut customers = self.customers_by_email.lock().unwrap();
        let id = customers
            .entry(req.email.clone())
            .or_insert_with(|| self.make_id("cust"))
            .clone();
        Ok(id)
    }

    async fn create_subscription(
        &self,
        req: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, RazorpayServiceError> {
        self.subscription_requests.lock().unwrap().push(req);
        if self.fail_subscription {
            return Err(RazorpayServiceError::Api {
                status: 400,
                message: "mock subscription failure".into(),
            });
        }
        Ok(GatewaySubscription {
            id: self.make_id("sub"),
            status: self
                .subscription_status
                .clone()
                .unwrap_or_else(|| "created".into()),
            current_end: None,
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        _signature_header: &str,
        event_id: Option<&str>,
    ) -> Result<RazorpayEvent, RazorpayServiceError> {
        if self.reject_signatures {
            return Err(RazorpayServiceError::Webhook("signature mismatch".into()));
        }
        RazorpayEvent::from_body(payload, event_id)
    }
}
