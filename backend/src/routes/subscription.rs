use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::models::plan::{catalog, Plan};
use crate::models::subscription::{Subscription, SubscriptionStatus, SubscriptionUpsert};
use crate::models::user::User;
use crate::responses::JsonResponse;
use crate::routes::auth::AuthSession;
use crate::services::mailer::{spawn_notification, EmailTemplate};
use crate::services::razorpay::{
    CreateCustomerRequest, CreateSubscriptionRequest, RazorpayServiceError,
};
use crate::state::AppState;

/// Billing cycles requested for every new subscription (one year of months).
const SUBSCRIPTION_TOTAL_COUNT: u32 = 12;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionBody {
    pub plan_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionFlowError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("user not found")]
    UserNotFound,
    #[error("billing gateway error: {0}")]
    Gateway(#[from] RazorpayServiceError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for SubscriptionFlowError {
    fn into_response(self) -> Response {
        match self {
            SubscriptionFlowError::InvalidPlan(_) => {
                JsonResponse::bad_request_with_code("Invalid plan", "invalid_plan").into_response()
            }
            SubscriptionFlowError::UserNotFound => {
                JsonResponse::not_found("User not found").into_response()
            }
            SubscriptionFlowError::Gateway(_) | SubscriptionFlowError::Database(_) => {
                JsonResponse::server_error("Failed to create subscription").into_response()
            }
        }
    }
}

// POST /api/razorpay/subscription
pub async fn create_subscription(
    State(app_state): State<AppState>,
    session: AuthSession,
    payload: Result<Json<CreateSubscriptionBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "malformed subscription request");
            return JsonResponse::bad_request("Invalid request body").into_response();
        }
    };

    match start_subscription(&app_state, session.clerk_id(), &body.plan_id).await {
        Ok(sub) => Json(json!({
            "success": true,
            "subscription": {
                "id": sub.razorpay_subscription_id,
                "status": sub.status,
                "planName": sub.plan_name,
            }
        }))
        .into_response(),
        Err(err) => {
            match &err {
                SubscriptionFlowError::InvalidPlan(plan_id) => {
                    warn!(plan_id, clerk_id = session.clerk_id(), "rejected unknown plan")
                }
                SubscriptionFlowError::UserNotFound => {
                    warn!(clerk_id = session.clerk_id(), "subscription requested by unknown user")
                }
                other => error!(err = %other, clerk_id = session.clerk_id(), "subscription creation failed"),
            }
            err.into_response()
        }
    }
}

/// Customer lookup-or-create, gateway subscription, then the local upsert.
/// The per-user lock spans all three so concurrent requests cannot each
/// create a customer.
async fn start_subscription(
    state: &AppState,
    clerk_id: &str,
    plan_id: &str,
) -> Result<Subscription, SubscriptionFlowError> {
    let plan = catalog()
        .find_by_id(plan_id)
        .ok_or_else(|| SubscriptionFlowError::InvalidPlan(plan_id.to_string()))?;

    let user = state
        .users
        .find_user_by_clerk_id(clerk_id)
        .await?
        .ok_or(SubscriptionFlowError::UserNotFound)?;

    let guard = state.customer_locks.lock(user.id).await;

    let existing = state.subscriptions.find_subscription_for_user(user.id).await?;
    let (customer_id, created_customer) =
        match existing.and_then(|s| s.razorpay_customer_id) {
            Some(id) => (id, false),
            None => {
                let id = state
                    .razorpay
                    .create_customer(customer_request(&user, clerk_id))
                    .await?;
                info!(user_id = %user.id, customer_id = %id, "created billing customer");
                (id, true)
            }
        };

    let gateway_sub = match state
        .razorpay
        .create_subscription(subscription_request(&user, plan, &customer_id))
        .await
    {
        Ok(sub) => sub,
        Err(err) => {
            if created_customer {
                error!(
                    user_id = %user.id,
                    customer_id = %customer_id,
                    "billing customer created but subscription failed; customer is orphaned"
                );
            }
            return Err(err.into());
        }
    };

    // New subscriptions always start as TRIALING locally; the webhook moves
    // them on once the gateway reports progress.
    let status = SubscriptionStatus::Trialing;
    if SubscriptionStatus::from_gateway(&gateway_sub.status) != Some(status) {
        info!(
            subscription_id = %gateway_sub.id,
            gateway_status = %gateway_sub.status,
            recorded_status = status.as_str(),
            "gateway status differs from recorded initial status"
        );
    }

    let upsert = SubscriptionUpsert {
        user_id: user.id,
        razorpay_customer_id: customer_id.clone(),
        razorpay_subscription_id: gateway_sub.id.clone(),
        status,
        plan_id: plan.id.to_string(),
        plan_name: plan.name.to_string(),
        amount: plan.amount_major(),
        currency: plan.currency.to_string(),
    };
    let subscription = match state.subscriptions.upsert_subscription(&upsert).await {
        Ok(sub) => sub,
        Err(err) => {
            error!(
                ?err,
                user_id = %user.id,
                customer_id = %customer_id,
                subscription_id = %gateway_sub.id,
                "gateway subscription created but local record failed; subscription is orphaned"
            );
            return Err(err.into());
        }
    };
    drop(guard);

    info!(
        user_id = %user.id,
        subscription_id = %gateway_sub.id,
        plan = plan.name,
        "subscription started"
    );

    let mut data = serde_json::Map::new();
    data.insert(
        "firstName".into(),
        json!(user.first_name.clone().unwrap_or_default()),
    );
    data.insert("planName".into(), json!(plan.name));
    data.insert("amount".into(), json!(plan.amount_major()));
    data.insert("dashboardUrl".into(), json!(state.config.dashboard_url()));
    spawn_notification(
        state.mailer.clone(),
        user.email.clone(),
        format!("Welcome to {} plan!", plan.name),
        EmailTemplate::SubscriptionCreated,
        data,
    );

    Ok(subscription)
}

fn customer_request(user: &User, clerk_id: &str) -> CreateCustomerRequest {
    let mut notes = BTreeMap::new();
    notes.insert("userId".to_string(), user.id.to_string());
    notes.insert("clerkId".to_string(), clerk_id.to_string());
    CreateCustomerRequest {
        name: user.display_name(),
        email: user.email.clone(),
        contact: user.phone.clone().unwrap_or_default(),
        notes,
    }
}

fn subscription_request(user: &User, plan: &Plan, customer_id: &str) -> CreateSubscriptionRequest {
    let mut notes = BTreeMap::new();
    notes.insert("userId".to_string(), user.id.to_string());
    notes.insert("planName".to_string(), plan.name.to_string());
    CreateSubscriptionRequest {
        plan_id: plan.id.to_string(),
        customer_id: customer_id.to_string(),
        quantity: 1,
        total_count: SUBSCRIPTION_TOTAL_COUNT,
        notes,
    }
}

// GET /api/razorpay/subscription
pub async fn get_subscription(State(app_state): State<AppState>, session: AuthSession) -> Response {
    let user = match app_state.users.find_user_by_clerk_id(session.clerk_id()).await {
        Ok(Some(user)) => user,
        Ok(None) => return JsonResponse::not_found("User not found").into_response(),
        Err(err) => {
            error!(?err, clerk_id = session.clerk_id(), "failed to load user");
            return JsonResponse::server_error("Failed to fetch subscription").into_response();
        }
    };

    match app_state.subscriptions.find_subscription_for_user(user.id).await {
        Ok(subscription) => (
            StatusCode::OK,
            Json(json!({
                "subscription": subscription,
                "availablePlans": catalog(),
            })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, user_id = %user.id, "failed to load subscription");
            JsonResponse::server_error("Failed to fetch subscription").into_response()
        }
    }
}
