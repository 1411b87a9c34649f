use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json as ResponseJson,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use db::models::user::User;
use services::services::auth::{
    LoginRequest, LoginResponse, RequestContext, SessionInfo, SignupRequest,
};
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::{SESSION_COOKIE, extract_session_token},
};

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<User>>), ApiError> {
    let user = state.auth().signup(&payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(user))))
}

/// Issue a session token, returned in the body and as an http-only cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, ResponseJson<ApiResponse<LoginResponse>>), ApiError> {
    let login = state.auth().login(&payload.email, &payload.password).await?;

    let cookie = Cookie::build((SESSION_COOKIE, login.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), ResponseJson(ApiResponse::success(login))))
}

/// The current session, or `null` data for anonymous callers.
pub async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ResponseJson<ApiResponse<Option<SessionInfo>>>, ApiError> {
    let token = extract_session_token(&headers);
    let session = state.auth().session(token.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
) -> Result<(CookieJar, ResponseJson<ApiResponse<()>>), ApiError> {
    state.auth().logout(ctx.session_id).await?;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, ResponseJson(ApiResponse::success(()))))
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/session", get(get_session))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/logout", post(logout))
}
