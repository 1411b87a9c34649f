use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, put},
};
use db::models::task::TaskRecord;
use services::services::{auth::RequestContext, board::BulkUpsertResponse};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Insert or overwrite a batch of tasks in one transaction.
pub async fn bulk_upsert_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(records): Json<Vec<TaskRecord>>,
) -> Result<ResponseJson<ApiResponse<BulkUpsertResponse>>, ApiError> {
    let upserted = state.boards().bulk_upsert(ctx.user.id, &records).await?;
    Ok(ResponseJson(ApiResponse::success(BulkUpsertResponse {
        upserted,
    })))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.boards().delete_task(ctx.user.id, task_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks/bulk", put(bulk_upsert_tasks))
        .route("/tasks/{task_id}", delete(delete_task))
}
