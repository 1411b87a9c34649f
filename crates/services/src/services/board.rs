//! Board and task operations on behalf of an authenticated user.
//!
//! Everything here is scoped to the owner: boards, lists and tasks belonging
//! to someone else behave exactly like rows that do not exist.

use std::{collections::HashSet, sync::Arc};

use db::{
    models::{
        board::{Board, BoardWithLists},
        list::{List, ListWithTasks},
        task::{CreateTask, Task, TaskRecord},
    },
    validation::{self, ValidationError},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    config::MoveFailurePolicy,
    drag::DragEvent,
    notification::{Notification, Notifier},
    reconciler::DragReconciler,
    task_store::{SqliteTaskStore, TaskStoreError},
};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Board not found")]
    BoardNotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("List not found")]
    ListNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct BulkUpsertResponse {
    pub upserted: u64,
}

/// Result of a server-side drag end.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct MoveResponse {
    /// False when the event did not resolve to a move; nothing was written.
    pub applied: bool,
    /// The board after the move, or after reconciliation if the write failed.
    pub lists: Vec<ListWithTasks>,
    pub notification: Option<Notification>,
}

#[derive(Clone)]
pub struct BoardService {
    pool: SqlitePool,
}

impl BoardService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_boards(&self, user_id: Uuid) -> Result<Vec<Board>, BoardError> {
        Ok(Board::find_by_user(&self.pool, user_id).await?)
    }

    /// Create a board with its three default lists.
    pub async fn create_board(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<BoardWithLists, BoardError> {
        let title = validation::normalize_title("Board", title)?;
        let board = Board::create_with_default_lists(&self.pool, user_id, &title).await?;
        info!(board_id = %board.id, %user_id, "Board created");
        Ok(board)
    }

    pub async fn find_board(&self, user_id: Uuid, board_id: Uuid) -> Result<Board, BoardError> {
        Board::find_owned(&self.pool, board_id, user_id)
            .await?
            .ok_or(BoardError::BoardNotFound)
    }

    pub async fn load_board(&self, board: Board) -> Result<BoardWithLists, BoardError> {
        Ok(Board::load_with_lists(&self.pool, board).await?)
    }

    pub async fn delete_board(&self, user_id: Uuid, board_id: Uuid) -> Result<(), BoardError> {
        let rows = Board::delete_owned(&self.pool, board_id, user_id).await?;
        if rows == 0 {
            return Err(BoardError::BoardNotFound);
        }
        info!(%board_id, %user_id, "Board deleted");
        Ok(())
    }

    /// Append a task to the board's first list.
    pub async fn create_task(&self, board: &Board, payload: &CreateTask) -> Result<Task, BoardError> {
        let title = validation::normalize_title("Task", &payload.title)?;
        let description = validation::normalize_description(payload.description.as_deref());

        let task = Task::create_in_first_list(&self.pool, board.id, &title, description.as_deref())
            .await?
            .ok_or(BoardError::ListNotFound)?;
        info!(task_id = %task.id, board_id = %board.id, position = task.position, "Task created");
        Ok(task)
    }

    /// Bulk upsert on behalf of `user_id`.
    ///
    /// Rejects the whole batch if any record names another user's task or a
    /// list the user does not own, or carries a blank title.
    pub async fn bulk_upsert(
        &self,
        user_id: Uuid,
        records: &[TaskRecord],
    ) -> Result<u64, BoardError> {
        if records.is_empty() {
            return Ok(0);
        }

        let records = records
            .iter()
            .map(|r| {
                Ok(TaskRecord {
                    title: validation::normalize_title("Task", &r.title)?,
                    description: validation::normalize_description(r.description.as_deref()),
                    ..r.clone()
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let task_ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        if !Task::find_foreign_ids(&self.pool, user_id, &task_ids)
            .await?
            .is_empty()
        {
            return Err(BoardError::TaskNotFound);
        }

        let list_ids: Vec<Uuid> = records
            .iter()
            .map(|r| r.list_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let owned = List::filter_owned_ids(&self.pool, user_id, &list_ids).await?;
        if owned.len() != list_ids.len() {
            return Err(BoardError::ListNotFound);
        }

        Ok(Task::bulk_upsert(&self.pool, &records).await?)
    }

    pub async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<(), BoardError> {
        let rows = Task::delete_owned(&self.pool, task_id, user_id).await?;
        if rows == 0 {
            return Err(BoardError::TaskNotFound);
        }
        info!(%task_id, %user_id, "Task deleted");
        Ok(())
    }

    /// Run a drag end through the reconciler against the database and wait for the write.
    pub async fn apply_drag(
        &self,
        board: &Board,
        event: DragEvent,
        notifier: Arc<dyn Notifier>,
        policy: MoveFailurePolicy,
    ) -> Result<MoveResponse, BoardError> {
        let store = Arc::new(SqliteTaskStore::new(self.pool.clone()));
        let reconciler = DragReconciler::load(board.id, store, notifier, policy).await?;

        let Some(handle) = reconciler.dispatch(event).await else {
            return Ok(MoveResponse {
                applied: false,
                lists: reconciler.lists().await,
                notification: None,
            });
        };

        let outcome = match handle.await {
            Ok(outcome) => Some(outcome.notification),
            Err(e) => {
                tracing::error!(board_id = %board.id, error = %e, "Move task panicked");
                reconciler.refresh().await?;
                None
            }
        };

        Ok(MoveResponse {
            applied: true,
            lists: reconciler.lists().await,
            notification: outcome,
        })
    }
}
