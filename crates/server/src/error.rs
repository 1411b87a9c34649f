use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{auth::AuthError, board::BoardError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Not authenticated")]
    Unauthorized,
}

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Board(err) => match err {
                BoardError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                BoardError::BoardNotFound | BoardError::TaskNotFound | BoardError::ListNotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                BoardError::Database(_) | BoardError::Store(_) => internal(),
            },
            ApiError::Auth(err) => match err {
                AuthError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                AuthError::EmailTaken => (StatusCode::CONFLICT, err.to_string()),
                AuthError::InvalidCredentials | AuthError::SessionInvalid => {
                    (StatusCode::UNAUTHORIZED, err.to_string())
                }
                AuthError::MalformedHash | AuthError::Hashing(_) | AuthError::Database(_) => {
                    internal()
                }
            },
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_ERROR_MESSAGE.to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}
