use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::responses::JsonResponse;
use crate::services::clerk::SessionClaims;
use crate::state::AppState;

/// Cookie Clerk's frontend SDK stores the session token in.
const SESSION_COOKIE: &str = "__session";

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub SessionClaims);

impl AuthSession {
    pub fn clerk_id(&self) -> &str {
        &self.0.sub
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || JsonResponse::unauthorized("Unauthorized").into_response();

        let token = session_token(&parts.headers).ok_or_else(unauthorized)?;
        let claims = state.sessions.verify(&token).map_err(|err| {
            tracing::debug!(%err, "rejected session token");
            unauthorized()
        })?;

        Ok(AuthSession(claims))
    }
}

/// Bearer header first, then the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}
