use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::list::{List, ListWithTasks};

/// Titles of the lists every new board starts with, in position order.
pub const DEFAULT_LIST_TITLES: [&str; 3] = ["À faire", "En cours", "Terminé"];

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBoard {
    pub title: String,
}

/// A board with its lists, each carrying its tasks.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct BoardWithLists {
    #[serde(flatten)]
    #[ts(flatten)]
    pub board: Board,
    pub lists: Vec<ListWithTasks>,
}

impl std::ops::Deref for BoardWithLists {
    type Target = Board;
    fn deref(&self) -> &Self::Target {
        &self.board
    }
}

impl Board {
    /// Boards owned by `user_id`, newest first.
    pub async fn find_by_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"SELECT id, title, user_id, created_at
            FROM boards
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            "SELECT id, title, user_id, created_at FROM boards WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// A board visible to `user_id`. Boards owned by someone else look absent.
    pub async fn find_owned(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            "SELECT id, title, user_id, created_at FROM boards WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Create a board and its three default lists atomically.
    pub async fn create_with_default_lists(
        pool: &SqlitePool,
        user_id: Uuid,
        title: &str,
    ) -> Result<BoardWithLists, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(
            r#"INSERT INTO boards (id, title, user_id)
            VALUES (?, ?, ?)
            RETURNING id, title, user_id, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut lists = Vec::with_capacity(DEFAULT_LIST_TITLES.len());
        for (position, list_title) in DEFAULT_LIST_TITLES.iter().enumerate() {
            let list = sqlx::query_as::<_, List>(
                r#"INSERT INTO lists (id, title, position, board_id)
                VALUES (?, ?, ?, ?)
                RETURNING id, title, position, board_id"#,
            )
            .bind(Uuid::new_v4())
            .bind(*list_title)
            .bind(position as i64)
            .bind(board.id)
            .fetch_one(&mut *tx)
            .await?;
            lists.push(ListWithTasks::new(list, Vec::new()));
        }

        tx.commit().await?;

        Ok(BoardWithLists { board, lists })
    }

    pub async fn load_with_lists(
        pool: &SqlitePool,
        board: Board,
    ) -> Result<BoardWithLists, sqlx::Error> {
        let lists = List::find_with_tasks(pool, board.id).await?;
        Ok(BoardWithLists { board, lists })
    }

    /// Delete a board owned by `user_id`; its lists and tasks cascade.
    pub async fn delete_owned(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
