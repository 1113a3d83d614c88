pub mod auth;
pub mod clerk;
pub mod razorpay;
pub mod subscription;
pub mod user;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::responses::JsonResponse;
use crate::state::AppState;

/// All application routes with state attached. Cross-cutting layers (CORS,
/// rate limiting, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/clerk/webhook", post(clerk::webhook))
        .route("/api/razorpay/webhook", post(razorpay::webhook))
        .route(
            "/api/razorpay/subscription",
            post(subscription::create_subscription).get(subscription::get_subscription),
        )
        .route("/api/user", get(user::get_current_user))
        .with_state(state)
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Hello from Zyntic!").into_response()
}
