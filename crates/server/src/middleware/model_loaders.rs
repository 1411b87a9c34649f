use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use services::services::{auth::RequestContext, board::BoardError};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Resolve `{board_id}` to a [`Board`](db::models::board::Board) owned by the caller.
///
/// Boards of other users answer 404, the same as missing ones.
pub async fn load_board_middleware(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(ctx) = request.extensions().get::<RequestContext>().cloned() else {
        return ApiError::Unauthorized.into_response();
    };

    let board = match state.boards().find_board(ctx.user.id, board_id).await {
        Ok(board) => board,
        Err(BoardError::BoardNotFound) => {
            tracing::warn!(%board_id, user_id = %ctx.user.id, "Board not found");
            return ApiError::from(BoardError::BoardNotFound).into_response();
        }
        Err(e) => {
            tracing::error!(%board_id, "Failed to fetch board: {}", e);
            return ApiError::from(e).into_response();
        }
    };

    request.extensions_mut().insert(board);
    next.run(request).await
}
