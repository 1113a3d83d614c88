use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::models::subscription::{
    GatewayStatusUpdate, GatewayUpdateOutcome, Subscription, SubscriptionStatus,
};
use crate::responses::JsonResponse;
use crate::services::mailer::{spawn_notification, EmailTemplate};
use crate::state::AppState;
use crate::utils::date::from_unix_seconds;

pub const RAZORPAY_EVENT_SOURCE: &str = "razorpay";

/// Local status a billing event moves a subscription to. `None` means the
/// event is not one we act on.
pub fn status_for_event(event: &str) -> Option<SubscriptionStatus> {
    match event {
        "subscription.authenticated" => Some(SubscriptionStatus::Trialing),
        "subscription.activated" | "subscription.charged" | "subscription.resumed" => {
            Some(SubscriptionStatus::Active)
        }
        "subscription.pending" | "subscription.halted" | "subscription.paused" => {
            Some(SubscriptionStatus::PastDue)
        }
        "subscription.cancelled" => Some(SubscriptionStatus::Cancelled),
        "subscription.completed" => Some(SubscriptionStatus::Expired),
        _ => None,
    }
}

fn received() -> Response {
    Json(json!({ "received": true })).into_response()
}

// POST /api/razorpay/webhook
pub async fn webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let sig = match headers
        .get("X-Razorpay-Signature")
        .and_then(|h| h.to_str().ok())
    {
        Some(s) => s,
        None => {
            return JsonResponse::bad_request("Missing X-Razorpay-Signature").into_response()
        }
    };
    let event_id = headers
        .get("X-Razorpay-Event-Id")
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty());

    let evt = match app_state.razorpay.verify_webhook(&body, sig, event_id) {
        Ok(e) => e,
        Err(err) => {
            warn!(?err, "razorpay webhook verification failed");
            return (StatusCode::BAD_REQUEST, "invalid webhook").into_response();
        }
    };

    // The claim is taken before anything is applied, so concurrent
    // redeliveries of one event id cannot both pass.
    if let Some(id) = evt.id.as_deref() {
        match app_state
            .webhook_events
            .claim_event(RAZORPAY_EVENT_SOURCE, id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!(event_id = id, event = %evt.event, "duplicate billing webhook ignored");
                return Json(json!({ "received": true, "duplicate": true })).into_response();
            }
            Err(err) => {
                error!(?err, event_id = id, "failed to claim billing webhook");
                return JsonResponse::server_error("Failed to process webhook").into_response();
            }
        }
    }

    let Some(new_status) = status_for_event(&evt.event) else {
        debug!(event = %evt.event, "billing webhook acknowledged without action");
        return received();
    };

    let Some(entity) = evt.subscription_entity() else {
        warn!(event = %evt.event, "billing webhook missing subscription entity");
        return received();
    };

    let update = GatewayStatusUpdate {
        razorpay_subscription_id: entity.id.clone(),
        status: new_status,
        current_period_end: entity.current_end.and_then(from_unix_seconds),
        event_at: evt
            .created_at
            .and_then(from_unix_seconds)
            .unwrap_or_else(Utc::now),
    };

    match app_state.subscriptions.apply_gateway_update(&update).await {
        Ok(GatewayUpdateOutcome::Applied(sub)) => {
            info!(
                user_id = %sub.user_id,
                subscription_id = %entity.id,
                status = sub.status.as_str(),
                event = %evt.event,
                "applied billing webhook"
            );
            if new_status == SubscriptionStatus::Cancelled {
                notify_cancelled(&app_state, &sub).await;
            }
        }
        Ok(GatewayUpdateOutcome::Stale(sub)) => {
            warn!(
                user_id = %sub.user_id,
                subscription_id = %entity.id,
                event = %evt.event,
                "ignored out-of-order billing webhook"
            );
        }
        Ok(GatewayUpdateOutcome::NotFound) => {
            warn!(subscription_id = %entity.id, event = %evt.event, "billing webhook for unknown subscription");
        }
        Err(err) => {
            error!(?err, subscription_id = %entity.id, event = %evt.event, "failed to apply billing webhook");
            if let Some(id) = evt.id.as_deref() {
                if let Err(err) = app_state
                    .webhook_events
                    .release_event(RAZORPAY_EVENT_SOURCE, id)
                    .await
                {
                    warn!(?err, event_id = id, "failed to release billing webhook claim");
                }
            }
            return JsonResponse::server_error("Failed to process webhook").into_response();
        }
    }

    received()
}

async fn notify_cancelled(app_state: &AppState, sub: &Subscription) {
    let user = match app_state.users.find_user_by_id(sub.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(user_id = %sub.user_id, "cancelled subscription has no user; skipping email");
            return;
        }
        Err(err) => {
            warn!(?err, user_id = %sub.user_id, "failed to load user for cancellation email");
            return;
        }
    };

    let mut data = serde_json::Map::new();
    data.insert(
        "firstName".into(),
        json!(user.first_name.unwrap_or_default()),
    );
    data.insert("planName".into(), json!(sub.plan_name));
    data.insert("dashboardUrl".into(), json!(app_state.config.dashboard_url()));
    spawn_notification(
        app_state.mailer.clone(),
        user.email,
        format!("Your {} subscription has been cancelled", sub.plan_name),
        EmailTemplate::SubscriptionCancelled,
        data,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        routing::post,
        Router,
    };
    use chrono::{DateTime, Duration as ChronoDuration};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;
    use uuid::Uuid;

    use crate::db::mock_db::MockDb;
    use crate::services::clerk::MockClerkService;
    use crate::services::mailer::MockMailer;
    use crate::services::razorpay::{sign_payload, LiveRazorpayService, MockRazorpayService};
    use crate::state::test_support::TestHarness;

    const CLERK_ID: &str = "user_ada";

    fn make_app(harness: &TestHarness) -> Router {
        Router::new()
            .route("/api/razorpay/webhook", post(webhook))
            .with_state(harness.state.clone())
    }

    fn subscription(user_id: Uuid, gateway_id: &str, status: SubscriptionStatus) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id,
            razorpay_customer_id: Some("cust_1".into()),
            razorpay_subscription_id: Some(gateway_id.into()),
            status,
            plan_id: "plan_pro_monthly".into(),
            plan_name: "Pro".into(),
            amount: 1999.0,
            currency: "INR".into(),
            current_period_end: None,
            last_event_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn harness_with(db: MockDb, razorpay: MockRazorpayService) -> (TestHarness, Uuid) {
        let db = db.with_user(CLERK_ID, "ada@example.com");
        let user_id = db.user(CLERK_ID).unwrap().id;
        let db = db.with_subscription(subscription(user_id, "sub_1", SubscriptionStatus::Trialing));
        let harness = TestHarness::with(db, razorpay, MockClerkService::new(), MockMailer::default());
        (harness, user_id)
    }

    fn event_body(event: &str, sub_id: &str, created_at: DateTime<Utc>, current_end: Option<i64>) -> String {
        json!({
            "entity": "event",
            "account_id": "acc_test",
            "event": event,
            "contains": ["subscription"],
            "created_at": created_at.timestamp(),
            "payload": {
                "subscription": {
                    "entity": {
                        "id": sub_id,
                        "status": "active",
                        "current_end": current_end
                    }
                }
            }
        })
        .to_string()
    }

    fn request(body: String, event_id: Option<&str>, signature: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/razorpay/webhook")
            .header("content-type", "application/json")
            .header("X-Razorpay-Signature", signature);
        if let Some(id) = event_id {
            builder = builder.header("X-Razorpay-Event-Id", id);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn maps_events_to_statuses() {
        assert_eq!(
            status_for_event("subscription.charged"),
            Some(SubscriptionStatus::Active)
        );
        assert_eq!(
            status_for_event("subscription.halted"),
            Some(SubscriptionStatus::PastDue)
        );
        assert_eq!(
            status_for_event("subscription.completed"),
            Some(SubscriptionStatus::Expired)
        );
        assert_eq!(status_for_event("payment.captured"), None);
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let (harness, _) = harness_with(MockDb::new(), MockRazorpayService::new());
        let req = Request::builder()
            .method("POST")
            .uri("/api/razorpay/webhook")
            .body(Body::from(event_body("subscription.activated", "sub_1", Utc::now(), None)))
            .unwrap();

        let res = make_app(&harness).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(harness.db.total_writes(), 0);
    }

    #[tokio::test]
    async fn bad_signature_writes_nothing() {
        let (mut harness, user_id) = harness_with(MockDb::new(), MockRazorpayService::new());
        let config = harness.state.config.clone();
        harness.state.razorpay = Arc::new(LiveRazorpayService::from_settings(
            reqwest::Client::new(),
            &config.razorpay,
        ));

        let body = event_body("subscription.cancelled", "sub_1", Utc::now(), None);
        let forged = sign_payload("not-the-secret", body.as_bytes());
        let res = make_app(&harness)
            .oneshot(request(body, Some("evt_1"), &forged))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(harness.db.total_writes(), 0);
        assert_eq!(harness.events.claim_count(), 0);
        assert_eq!(
            harness.db.subscription_for(user_id).unwrap().status,
            SubscriptionStatus::Trialing
        );
    }

    #[tokio::test]
    async fn rejected_signature_is_400_before_claiming() {
        let razorpay = MockRazorpayService {
            reject_signatures: true,
            ..MockRazorpayService::new()
        };
        let (harness, user_id) = harness_with(MockDb::new(), razorpay);

        let res = make_app(&harness)
            .oneshot(request(
                event_body("subscription.cancelled", "sub_1", Utc::now(), None),
                Some("evt_forged"),
                "sig",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(harness.events.claim_count(), 0);
        assert_eq!(harness.db.total_writes(), 0);
        assert_eq!(
            harness.db.subscription_for(user_id).unwrap().status,
            SubscriptionStatus::Trialing
        );
    }

    #[tokio::test]
    async fn correctly_signed_event_is_applied() {
        let (mut harness, user_id) = harness_with(MockDb::new(), MockRazorpayService::new());
        let config = harness.state.config.clone();
        harness.state.razorpay = Arc::new(LiveRazorpayService::from_settings(
            reqwest::Client::new(),
            &config.razorpay,
        ));

        let period_end = Utc::now().timestamp() + 30 * 24 * 3600;
        let body = event_body("subscription.activated", "sub_1", Utc::now(), Some(period_end));
        let sig = sign_payload(&config.razorpay.webhook_secret, body.as_bytes());
        let res = make_app(&harness)
            .oneshot(request(body, Some("evt_1"), &sig))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["received"], true);
        let row = harness.db.subscription_for(user_id).unwrap();
        assert_eq!(row.status, SubscriptionStatus::Active);
        assert_eq!(row.current_period_end.unwrap().timestamp(), period_end);
    }

    #[tokio::test]
    async fn duplicate_event_id_applies_once() {
        let (harness, _) = harness_with(MockDb::new(), MockRazorpayService::new());
        let body = event_body("subscription.charged", "sub_1", Utc::now(), None);

        let first = make_app(&harness)
            .oneshot(request(body.clone(), Some("evt_dup"), "sig"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = make_app(&harness)
            .oneshot(request(body, Some("evt_dup"), "sig"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(json_body(second).await["duplicate"], true);

        assert_eq!(*harness.db.subscription_writes.lock().unwrap(), 1);
        assert_eq!(
            harness.events.recorded_events(),
            vec![(RAZORPAY_EVENT_SOURCE.to_string(), "evt_dup".to_string())]
        );
    }

    #[tokio::test]
    async fn older_event_does_not_override_newer_status() {
        let (harness, user_id) = harness_with(MockDb::new(), MockRazorpayService::new());
        let now = Utc::now();

        make_app(&harness)
            .oneshot(request(
                event_body("subscription.charged", "sub_1", now, None),
                Some("evt_new"),
                "sig",
            ))
            .await
            .unwrap();
        let res = make_app(&harness)
            .oneshot(request(
                event_body("subscription.halted", "sub_1", now - ChronoDuration::hours(1), None),
                Some("evt_old"),
                "sig",
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            harness.db.subscription_for(user_id).unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn cancellation_sets_status_and_emails_user() {
        let (harness, user_id) = harness_with(MockDb::new(), MockRazorpayService::new());

        let res = make_app(&harness)
            .oneshot(request(
                event_body("subscription.cancelled", "sub_1", Utc::now(), None),
                Some("evt_cancel"),
                "sig",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            harness.db.subscription_for(user_id).unwrap().status,
            SubscriptionStatus::Cancelled
        );

        assert!(
            harness
                .mailer
                .wait_for_attempts(1, Duration::from_secs(2))
                .await
        );
        let sent = harness.mailer.sent();
        assert_eq!(sent[0].to, "ada@example.com");
        assert!(sent[0].html.contains("Subscription Cancelled"));
    }

    #[tokio::test]
    async fn unknown_subscription_and_event_are_acknowledged() {
        let (harness, _) = harness_with(MockDb::new(), MockRazorpayService::new());

        let res = make_app(&harness)
            .oneshot(request(
                event_body("subscription.activated", "sub_unknown", Utc::now(), None),
                None,
                "sig",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = make_app(&harness)
            .oneshot(request(
                json!({"event": "payment.captured", "payload": {}}).to_string(),
                None,
                "sig",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(harness.db.total_writes(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_is_500_and_not_recorded() {
        let db = MockDb {
            fail_subscription_writes: true,
            ..MockDb::new()
        };
        let (harness, _) = harness_with(db, MockRazorpayService::new());

        let res = make_app(&harness)
            .oneshot(request(
                event_body("subscription.activated", "sub_1", Utc::now(), None),
                Some("evt_fail"),
                "sig",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(harness.events.recorded_events().is_empty());
        assert_eq!(*harness.events.releases.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_redeliveries_apply_and_email_once() {
        let (harness, user_id) = harness_with(MockDb::new(), MockRazorpayService::new());
        let body = event_body("subscription.cancelled", "sub_1", Utc::now(), None);

        let (a, b) = tokio::join!(
            make_app(&harness).oneshot(request(body.clone(), Some("evt_race"), "sig")),
            make_app(&harness).oneshot(request(body, Some("evt_race"), "sig")),
        );
        let a = json_body(a.unwrap()).await;
        let b = json_body(b.unwrap()).await;
        let duplicates = [&a, &b]
            .iter()
            .filter(|v| v["duplicate"] == true)
            .count();
        assert_eq!(duplicates, 1);

        assert_eq!(*harness.db.subscription_writes.lock().unwrap(), 1);
        assert_eq!(
            harness.db.subscription_for(user_id).unwrap().status,
            SubscriptionStatus::Cancelled
        );
        assert!(
            harness
                .mailer
                .wait_for_attempts(1, Duration::from_secs(2))
                .await
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(harness.mailer.attempts(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_can_be_retried() {
        let db = MockDb {
            fail_subscription_writes: true,
            ..MockDb::new()
        };
        let (mut harness, user_id) = harness_with(db, MockRazorpayService::new());
        let body = event_body("subscription.activated", "sub_1", Utc::now(), None);

        let res = make_app(&harness)
            .oneshot(request(body.clone(), Some("evt_retry"), "sig"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let healthy = Arc::new(
            MockDb::new().with_subscription(subscription(user_id, "sub_1", SubscriptionStatus::Trialing)),
        );
        harness.state.subscriptions = healthy.clone();
        let res = make_app(&harness)
            .oneshot(request(body, Some("evt_retry"), "sig"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await.get("duplicate"), None);
        assert_eq!(
            healthy.subscription_for(user_id).unwrap().status,
            SubscriptionStatus::Active
        );
    }
}
