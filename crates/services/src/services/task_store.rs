use async_trait::async_trait;
use db::models::{
    list::{List, ListWithTasks},
    task::{Task, TaskRecord},
};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use super::board_client::BoardClientError;

#[derive(Debug, Error)]
pub enum TaskStoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Client(#[from] BoardClientError),
}

/// Where the drag engine persists task rows and reloads authoritative lists.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert-or-update every record by id, atomically. Returns the affected row count.
    async fn upsert_tasks(&self, records: &[TaskRecord]) -> Result<u64, TaskStoreError>;

    /// The board's lists by position, each with its tasks by position.
    async fn load_lists(&self, board_id: Uuid) -> Result<Vec<ListWithTasks>, TaskStoreError>;
}

/// Server-side store backed directly by the database.
#[derive(Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn upsert_tasks(&self, records: &[TaskRecord]) -> Result<u64, TaskStoreError> {
        Ok(Task::bulk_upsert(&self.pool, records).await?)
    }

    async fn load_lists(&self, board_id: Uuid) -> Result<Vec<ListWithTasks>, TaskStoreError> {
        Ok(List::find_with_tasks(&self.pool, board_id).await?)
    }
}
