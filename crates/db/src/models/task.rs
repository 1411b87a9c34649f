//! Task model.
//!
//! A task belongs to exactly one list. Within a list, ascending `position`
//! defines render order; positions are dense only in lists a move has touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::list::List;

const TASK_COLUMNS: &str = "id, title, description, position, list_id, created_at, updated_at";

/// Rows per INSERT statement in a bulk upsert (5 bound values each).
const UPSERT_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
    pub list_id: Uuid, // Foreign key to List
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
}

/// The persisted shape of a task, written by bulk upsert keyed on `id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub list_id: Uuid,
    pub position: i64,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            list_id: task.list_id,
            position: task.position,
        }
    }
}

impl Task {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_list_id(
        pool: &SqlitePool,
        list_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE list_id = ? ORDER BY position ASC, created_at ASC"
        ))
        .bind(list_id)
        .fetch_all(pool)
        .await
    }

    /// All tasks of a board, sorted by position (ties broken by creation time).
    pub async fn find_by_board_id(
        pool: &SqlitePool,
        board_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"SELECT t.id, t.title, t.description, t.position, t.list_id, t.created_at, t.updated_at
            FROM tasks t
            JOIN lists l ON l.id = t.list_id
            WHERE l.board_id = ?
            ORDER BY t.position ASC, t.created_at ASC"#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Position for a task appended to `list_id`: highest position + 1, or 0 when empty.
    pub async fn next_position<'e, E>(executor: E, list_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(position) FROM tasks WHERE list_id = ?")
                .bind(list_id)
                .fetch_one(executor)
                .await?;
        Ok(max.map_or(0, |p| p + 1))
    }

    /// Create a task at the end of the board's position-0 list.
    ///
    /// Returns `None` when the board has no list at position 0.
    pub async fn create_in_first_list(
        pool: &SqlitePool,
        board_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(todo_list) = List::find_first_for_board(&mut *tx, board_id).await? else {
            return Ok(None);
        };
        let position = Self::next_position(&mut *tx, todo_list.id).await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, title, description, position, list_id)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {TASK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(position)
        .bind(todo_list.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(task))
    }

    /// Insert-or-update every record by primary key in one transaction.
    pub async fn bulk_upsert(pool: &SqlitePool, records: &[TaskRecord]) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        let mut affected = 0;

        for chunk in records.chunks(UPSERT_CHUNK_SIZE) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "INSERT INTO tasks (id, title, description, list_id, position) ",
            );
            query.push_values(chunk, |mut row, record| {
                row.push_bind(record.id)
                    .push_bind(record.title.clone())
                    .push_bind(record.description.clone())
                    .push_bind(record.list_id)
                    .push_bind(record.position);
            });
            query.push(
                " ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    list_id = excluded.list_id,
                    position = excluded.position,
                    updated_at = datetime('now', 'subsec')",
            );
            affected += query.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }

    /// Ids among `task_ids` that exist but live on a board not owned by `user_id`.
    pub async fn find_foreign_ids(
        pool: &SqlitePool,
        user_id: Uuid,
        task_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            r#"SELECT t.id FROM tasks t
            JOIN lists l ON l.id = t.list_id
            JOIN boards b ON b.id = l.board_id
            WHERE b.user_id <> "#,
        );
        query.push_bind(user_id);
        query.push(" AND t.id IN (");
        let mut separated = query.separated(", ");
        for id in task_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query.build_query_scalar::<Uuid>().fetch_all(pool).await
    }

    /// Hard delete, scoped to boards owned by `user_id`.
    pub async fn delete_owned(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"DELETE FROM tasks
            WHERE id = ?
              AND list_id IN (
                SELECT l.id FROM lists l
                JOIN boards b ON b.id = l.board_id
                WHERE b.user_id = ?
              )"#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
