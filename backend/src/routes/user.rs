use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, warn};

use crate::models::user::IdentityUpsertOutcome;
use crate::responses::JsonResponse;
use crate::routes::auth::AuthSession;
use crate::state::AppState;

// GET /api/user
//
// Pulls the caller's profile from Clerk and folds it into the local row, so
// the dashboard always sees current identity data even if a webhook was lost.
pub async fn get_current_user(State(app_state): State<AppState>, session: AuthSession) -> Response {
    let clerk_user = match app_state.clerk.get_user(session.clerk_id()).await {
        Ok(data) => data,
        Err(err) => {
            error!(%err, clerk_id = session.clerk_id(), "failed to fetch Clerk profile");
            return JsonResponse::server_error("Failed to load user").into_response();
        }
    };

    let profile = clerk_user.to_identity_profile(Utc::now());
    let user = match app_state.users.upsert_identity_user(&profile).await {
        Ok(IdentityUpsertOutcome::Stale(user)) => {
            warn!(user_id = %user.id, "stored identity is newer than fetched profile");
            user
        }
        Ok(outcome) => outcome.into_user(),
        Err(err) => {
            error!(?err, clerk_id = session.clerk_id(), "failed to sync user profile");
            return JsonResponse::server_error("Failed to load user").into_response();
        }
    };

    let subscription = match app_state.subscriptions.find_subscription_for_user(user.id).await {
        Ok(sub) => sub,
        Err(err) => {
            error!(?err, user_id = %user.id, "failed to load subscription");
            return JsonResponse::server_error("Failed to load user").into_response();
        }
    };
    let entitled = subscription
        .as_ref()
        .is_some_and(|s| s.grants_access(Utc::now()));

    Json(json!({
        "user": user,
        "subscription": subscription,
        "entitled": entitled,
    }))
    .into_response()
}
