use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};

use crate::models::user::IdentityUpsertOutcome;
use crate::responses::JsonResponse;
use crate::state::AppState;

// POST /api/clerk/webhook
pub async fn webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = match app_state.clerk_webhooks.verify(&headers, &body) {
        Ok(evt) => evt,
        Err(err) => {
            warn!(%err, "clerk webhook verification failed");
            return JsonResponse::bad_request("Invalid webhook signature").into_response();
        }
    };

    match event.event_type.as_str() {
        "user.created" => {
            let data = match event.user_data() {
                Ok(d) => d,
                Err(err) => {
                    warn!(%err, "user.created payload missing user data");
                    return JsonResponse::bad_request("Invalid webhook payload").into_response();
                }
            };
            let profile = data.to_identity_profile(event.delivered_at);

            match app_state.users.upsert_identity_user(&profile).await {
                Ok(IdentityUpsertOutcome::Created(user)) => {
                    info!(user_id = %user.id, clerk_id = %user.clerk_id, "created user from identity webhook");
                }
                Ok(IdentityUpsertOutcome::Updated(user)) => {
                    info!(user_id = %user.id, clerk_id = %user.clerk_id, "refreshed existing user from identity webhook");
                }
                Ok(IdentityUpsertOutcome::Stale(user)) => {
                    warn!(
                        user_id = %user.id,
                        clerk_id = %user.clerk_id,
                        observed_at = %profile.observed_at,
                        "ignored out-of-order identity webhook"
                    );
                }
                Err(err) => {
                    error!(?err, clerk_id = %profile.clerk_id, "failed to persist identity webhook");
                    return JsonResponse::server_error("Internal server error").into_response();
                }
            }
        }
        other => debug!(event_type = other, "identity webhook acknowledged without action"),
    }

    JsonResponse::success("Webhook received").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use crate::db::mock_db::MockDb;
    use crate::services::clerk::MockClerkService;
    use crate::services::mailer::MockMailer;
    use crate::services::razorpay::MockRazorpayService;
    use crate::state::test_support::TestHarness;

    fn make_app(harness: &TestHarness) -> Router {
        Router::new()
            .route("/api/clerk/webhook", post(webhook))
            .with_state(harness.state.clone())
    }

    fn user_created(clerk_id: &str, email: &str, updated_at_ms: i64) -> String {
        json!({
            "type": "user.created",
            "object": "event",
            "data": {
                "id": clerk_id,
                "email_addresses": [{"id": "idn_1", "email_address": email}],
                "primary_email_address_id": "idn_1",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "image_url": "https://img.clerk.test/ada.png",
                "updated_at": updated_at_ms
            }
        })
        .to_string()
    }

    fn signed_request(harness: &TestHarness, body: &str) -> Request<Body> {
        let ts = Utc::now().timestamp().to_string();
        let sig = harness
            .state
            .clerk_webhooks
            .sign("msg_test", &ts, body.as_bytes())
            .unwrap();
        Request::builder()
            .method("POST")
            .uri("/api/clerk/webhook")
            .header("content-type", "application/json")
            .header("svix-id", "msg_test")
            .header("svix-timestamp", ts)
            .header("svix-signature", format!("v1,{sig}"))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invalid_signature_writes_nothing() {
        let harness = TestHarness::new();
        let body = user_created("user_1", "ada@example.com", Utc::now().timestamp_millis());
        let req = Request::builder()
            .method("POST")
            .uri("/api/clerk/webhook")
            .header("svix-id", "msg_test")
            .header("svix-timestamp", Utc::now().timestamp().to_string())
            .header("svix-signature", "v1,Zm9yZ2VkLXNpZ25hdHVyZQ==")
            .body(Body::from(body))
            .unwrap();

        let res = make_app(&harness).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(harness.db.total_writes(), 0);
        assert_eq!(harness.db.user_count(), 0);
    }

    #[tokio::test]
    async fn missing_headers_fail_closed() {
        let harness = TestHarness::new();
        let req = Request::builder()
            .method("POST")
            .uri("/api/clerk/webhook")
            .body(Body::from(user_created("user_1", "a@example.com", 0)))
            .unwrap();

        let res = make_app(&harness).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(harness.db.total_writes(), 0);
    }

    #[tokio::test]
    async fn user_created_upserts_one_row_per_clerk_id() {
        let harness = TestHarness::new();
        let body = user_created("user_1", "ada@example.com", Utc::now().timestamp_millis());

        for _ in 0..2 {
            let res = make_app(&harness)
                .oneshot(signed_request(&harness, &body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            let json = json_body(res).await;
            assert_eq!(json["message"], "Webhook received");
        }

        assert_eq!(harness.db.user_count(), 1);
        let user = harness.db.user("user_1").unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.image_url.as_deref(), Some("https://img.clerk.test/ada.png"));
    }

    #[tokio::test]
    async fn stale_delivery_does_not_overwrite_newer_data() {
        let harness = TestHarness::new();
        let now = Utc::now();
        let newer = user_created("user_1", "new@example.com", now.timestamp_millis());
        let older = user_created(
            "user_1",
            "old@example.com",
            (now - Duration::minutes(10)).timestamp_millis(),
        );

        make_app(&harness)
            .oneshot(signed_request(&harness, &newer))
            .await
            .unwrap();
        let res = make_app(&harness)
            .oneshot(signed_request(&harness, &older))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(harness.db.user("user_1").unwrap().email, "new@example.com");
    }

    #[tokio::test]
    async fn sparse_address_entries_are_tolerated() {
        let harness = TestHarness::new();
        let body = json!({
            "type": "user.created",
            "data": {
                "id": "user_sparse",
                "email_addresses": [
                    {"id": "idn_0"},
                    {"id": "idn_1", "email_address": "sparse@example.com"}
                ],
                "phone_numbers": [{"id": "ph_0"}],
                "updated_at": Utc::now().timestamp_millis()
            }
        })
        .to_string();

        let res = make_app(&harness)
            .oneshot(signed_request(&harness, &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let user = harness.db.user("user_sparse").unwrap();
        assert_eq!(user.email, "sparse@example.com");
        assert_eq!(user.phone, None);
    }

    #[tokio::test]
    async fn other_event_types_are_acknowledged_without_writes() {
        let harness = TestHarness::new();
        let body = json!({"type": "session.created", "data": {"id": "sess_1"}}).to_string();

        let res = make_app(&harness)
            .oneshot(signed_request(&harness, &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(harness.db.total_writes(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_returns_500() {
        let harness = TestHarness::with(
            MockDb::failing(),
            MockRazorpayService::new(),
            MockClerkService::new(),
            MockMailer::default(),
        );
        let body = user_created("user_1", "ada@example.com", Utc::now().timestamp_millis());

        let res = make_app(&harness)
            .oneshot(signed_request(&harness, &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
