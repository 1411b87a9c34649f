use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    board::{Board, BoardWithLists, CreateBoard},
    task::{CreateTask, Task},
};
use services::services::{auth::RequestContext, board::MoveResponse, drag::DragEvent};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, middleware::load_board_middleware};

pub async fn get_boards(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<ResponseJson<ApiResponse<Vec<Board>>>, ApiError> {
    let boards = state.boards().list_boards(ctx.user.id).await?;
    Ok(ResponseJson(ApiResponse::success(boards)))
}

pub async fn create_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateBoard>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<BoardWithLists>>), ApiError> {
    let board = state
        .boards()
        .create_board(ctx.user.id, &payload.title)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(board))))
}

pub async fn get_board(
    State(state): State<AppState>,
    Extension(board): Extension<Board>,
) -> Result<ResponseJson<ApiResponse<BoardWithLists>>, ApiError> {
    let board = state.boards().load_board(board).await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub async fn delete_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(board): Extension<Board>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.boards().delete_board(ctx.user.id, board.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(board): Extension<Board>,
    Json(payload): Json<CreateTask>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    let task = state.boards().create_task(&board, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(task))))
}

/// Resolve a drag end on the server and persist the affected lists.
pub async fn move_task(
    State(state): State<AppState>,
    Extension(board): Extension<Board>,
    Json(event): Json<DragEvent>,
) -> Result<ResponseJson<ApiResponse<MoveResponse>>, ApiError> {
    let response = state
        .boards()
        .apply_drag(
            &board,
            event,
            state.notifier(),
            state.config().move_failure_policy,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(response)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let board_id_router = Router::new()
        .route("/", get(get_board).delete(delete_board))
        .route("/tasks", post(create_task))
        .route("/moves", post(move_task))
        .layer(from_fn_with_state(state.clone(), load_board_middleware));

    let inner = Router::new()
        .route("/", get(get_boards).post(create_board))
        .nest("/{board_id}", board_id_router);

    Router::new().nest("/boards", inner)
}
