use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    extract::CookieJar,
    headers::{Authorization, HeaderMapExt, authorization::Bearer},
};
use services::services::auth::AuthError;
use tracing::warn;
use utils::response::ApiResponse;

use crate::AppState;

/// Cookie holding the session token for browser clients.
pub const SESSION_COOKIE: &str = "taskflow_session";

/// Bearer token first, then the session cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_owned());
    }
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"))
}

fn unauthenticated(state: &AppState, headers: &HeaderMap) -> Response {
    if wants_html(headers) {
        return Redirect::to(&state.config().login_path).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error("Not authenticated")),
    )
        .into_response()
}

/// Rejects requests without a live session and attaches a
/// [`RequestContext`](services::services::auth::RequestContext) otherwise.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_session_token(req.headers()) else {
        return unauthenticated(&state, req.headers());
    };

    let ctx = match state.auth().authenticate(&token).await {
        Ok(ctx) => ctx,
        Err(AuthError::SessionInvalid) => {
            warn!(uri = %req.uri(), "Rejected stale or unknown session token");
            return unauthenticated(&state, req.headers());
        }
        Err(error) => {
            warn!(?error, "Failed to authenticate session");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error("Internal server error")),
            )
                .into_response();
        }
    };

    req.extensions_mut().insert(ctx);
    next.run(req).await
}
