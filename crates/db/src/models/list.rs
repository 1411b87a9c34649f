use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::task::Task;

/// A column of a board. `position` orders columns left to right.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct List {
    pub id: Uuid,
    pub title: String,
    pub position: i64,
    pub board_id: Uuid,
}

/// A list together with its tasks, ordered by task position.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct ListWithTasks {
    #[serde(flatten)]
    #[ts(flatten)]
    pub list: List,
    pub tasks: Vec<Task>,
}

impl std::ops::Deref for ListWithTasks {
    type Target = List;
    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl ListWithTasks {
    pub fn new(list: List, tasks: Vec<Task>) -> Self {
        Self { list, tasks }
    }
}

impl List {
    pub async fn find_by_board_id<'e, E>(
        executor: E,
        board_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, List>(
            r#"SELECT id, title, position, board_id
            FROM lists
            WHERE board_id = ?
            ORDER BY position ASC"#,
        )
        .bind(board_id)
        .fetch_all(executor)
        .await
    }

    /// The "À faire" column: the list at position 0 of the board.
    pub async fn find_first_for_board<'e, E>(
        executor: E,
        board_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, List>(
            r#"SELECT id, title, position, board_id
            FROM lists
            WHERE board_id = ? AND position = 0"#,
        )
        .bind(board_id)
        .fetch_optional(executor)
        .await
    }

    /// Load every list of a board with its tasks grouped and sorted by position.
    pub async fn find_with_tasks(
        pool: &SqlitePool,
        board_id: Uuid,
    ) -> Result<Vec<ListWithTasks>, sqlx::Error> {
        let lists = Self::find_by_board_id(pool, board_id).await?;
        let mut tasks = Task::find_by_board_id(pool, board_id).await?;

        Ok(lists
            .into_iter()
            .map(|list| {
                let (own, rest): (Vec<Task>, Vec<Task>) =
                    tasks.drain(..).partition(|t| t.list_id == list.id);
                tasks = rest;
                ListWithTasks::new(list, own)
            })
            .collect())
    }

    /// Subset of `list_ids` that belong to boards owned by `user_id`.
    pub async fn filter_owned_ids(
        pool: &SqlitePool,
        user_id: Uuid,
        list_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        if list_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT l.id FROM lists l JOIN boards b ON b.id = l.board_id WHERE b.user_id = ",
        );
        query.push_bind(user_id);
        query.push(" AND l.id IN (");
        let mut separated = query.separated(", ");
        for id in list_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query.build_query_scalar::<Uuid>().fetch_all(pool).await
    }
}
