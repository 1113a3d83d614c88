use crate::config::Config;
use crate::db::{
    subscription_repository::SubscriptionRepository, user_repository::UserRepository,
    webhook_event_log_repository::WebhookEventLogRepository,
};
use crate::services::clerk::{ClerkService, ClerkWebhookVerifier, SessionVerifier};
use crate::services::mailer::Mailer;
use crate::services::razorpay::RazorpayService;
use crate::utils::keyed_lock::KeyedLocks;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub webhook_events: Arc<dyn WebhookEventLogRepository>,
    pub razorpay: Arc<dyn RazorpayService>,
    pub clerk: Arc<dyn ClerkService>,
    pub clerk_webhooks: Arc<ClerkWebhookVerifier>,
    pub sessions: Arc<SessionVerifier>,
    pub mailer: Arc<dyn Mailer>,
    /// Serializes subscription creation per local user id.
    pub customer_locks: Arc<KeyedLocks<Uuid>>,
    pub config: Arc<Config>,
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::config::test_config;
    use crate::db::{
        mock_db::MockDb, mock_webhook_event_log_repository::MockWebhookEventLogRepository,
    };
    use crate::services::clerk::{session::issue_test_token, MockClerkService};
    use crate::services::mailer::MockMailer;
    use crate::services::razorpay::MockRazorpayService;

    pub const TEST_SESSION_SECRET: &[u8] = b"zyntic-session-test-secret-0123456789";

    /// Mock collaborators plus the state that wires them together. Tests
    /// keep the handles to inspect what the handlers did.
    pub struct TestHarness {
        pub db: Arc<MockDb>,
        pub events: Arc<MockWebhookEventLogRepository>,
        pub razorpay: Arc<MockRazorpayService>,
        pub clerk: Arc<MockClerkService>,
        pub mailer: Arc<MockMailer>,
        pub state: AppState,
    }

    impl TestHarness {
        pub fn new() -> Self {
            Self::with(
                MockDb::new(),
                MockRazorpayService::new(),
                MockClerkService::new(),
                MockMailer::default(),
            )
        }

        pub fn with(
            db: MockDb,
            razorpay: MockRazorpayService,
            clerk: MockClerkService,
            mailer: MockMailer,
        ) -> Self {
            let config = test_config();
            let db = Arc::new(db);
            let events = Arc::new(MockWebhookEventLogRepository::default());
            let razorpay = Arc::new(razorpay);
            let clerk = Arc::new(clerk);
            let mailer = Arc::new(mailer);
            let clerk_webhooks = ClerkWebhookVerifier::new(&config.clerk.webhook_secret)
                .expect("test webhook secret decodes");

            let state = AppState {
                users: db.clone(),
                subscriptions: db.clone(),
                webhook_events: events.clone(),
                razorpay: razorpay.clone(),
                clerk: clerk.clone(),
                clerk_webhooks: Arc::new(clerk_webhooks),
                sessions: Arc::new(SessionVerifier::from_secret(TEST_SESSION_SECRET, None)),
                mailer: mailer.clone(),
                customer_locks: Arc::new(KeyedLocks::new()),
                config: Arc::new(config),
            };

            Self {
                db,
                events,
                razorpay,
                clerk,
                mailer,
                state,
            }
        }

        /// `Authorization` header value for a signed-in Clerk user.
        pub fn bearer(clerk_id: &str) -> String {
            format!(
                "Bearer {}",
                issue_test_token(TEST_SESSION_SECRET, clerk_id, 600)
            )
        }
    }
}
