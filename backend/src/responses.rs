use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
}

impl JsonResponse {
    fn build(status: StatusCode, msg: &str, code: Option<&str>) -> impl IntoResponse {
        let success = status.is_success();
        (
            status,
            Json(JsonResponse {
                status: if success { "success" } else { "error" }.to_string(),
                success,
                message: msg.to_string(),
                code: code.map(str::to_string),
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::OK, msg, None)
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::NOT_FOUND, msg, None)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, msg, None)
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::UNAUTHORIZED, msg, None)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::BAD_REQUEST, msg, None)
    }

    pub fn bad_request_with_code(msg: &str, code: &str) -> impl IntoResponse {
        Self::build(StatusCode::BAD_REQUEST, msg, Some(code))
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::TOO_MANY_REQUESTS, msg, None)
    }
}
