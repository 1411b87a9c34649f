//! Fixtures for database tests.
//!
//! The schema is migrated once per test binary into a template file; every
//! pool handed out is a private copy of it.

use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tempfile::TempDir;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::models::{
    board::{Board, BoardWithLists},
    task::{Task, TaskRecord},
    user::User,
};

const TEMPLATE_FILE: &str = "template.db";

static TEMPLATE: OnceCell<TempDir> = OnceCell::const_new();

fn connect_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
        .expect("Invalid test database path")
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
}

async fn template_path() -> &'static Path {
    let dir = TEMPLATE
        .get_or_init(|| async {
            let dir = TempDir::new().expect("Failed to create template dir");
            let options = connect_options(&dir.path().join(TEMPLATE_FILE)).create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await
                .expect("Failed to open template database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to migrate template database");

            // Fold the WAL into the main file so a plain copy is complete.
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
                .execute(&pool)
                .await
                .expect("Failed to checkpoint template database");
            pool.close().await;

            tracing::debug!(path = %dir.path().display(), "Template database migrated");
            dir
        })
        .await;
    dir.path()
}

/// A migrated, empty database private to the calling test.
///
/// Keep the returned [`TempDir`] alive for as long as the pool is used.
pub async fn create_test_pool() -> (SqlitePool, TempDir) {
    let template = template_path().await.join(TEMPLATE_FILE);

    let dir = TempDir::new().expect("Failed to create test dir");
    let db_path = dir.path().join("test.db");
    std::fs::copy(&template, &db_path).expect("Failed to copy template database");

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(connect_options(&db_path))
        .await
        .expect("Failed to open test database");

    (pool, dir)
}

/// Insert a user with a placeholder password hash and return its id.
pub async fn seed_user(pool: &SqlitePool, email: &str) -> Uuid {
    User::create(pool, email, "not-a-real-hash")
        .await
        .expect("Failed to seed user")
        .id
}

/// Create a board for `user_id` whose default lists hold the given task
/// titles, in order. Missing entries leave a list empty; extra ones panic.
pub async fn seed_board(pool: &SqlitePool, user_id: Uuid, columns: &[&[&str]]) -> BoardWithLists {
    let board = Board::create_with_default_lists(pool, user_id, "Seeded board")
        .await
        .expect("Failed to seed board");
    assert!(
        columns.len() <= board.lists.len(),
        "seeded board only has {} lists",
        board.lists.len()
    );

    let records: Vec<TaskRecord> = board
        .lists
        .iter()
        .zip(columns)
        .flat_map(|(list, titles)| {
            titles.iter().enumerate().map(|(position, title)| TaskRecord {
                id: Uuid::new_v4(),
                title: title.to_string(),
                description: None,
                list_id: list.list.id,
                position: position as i64,
            })
        })
        .collect();
    Task::bulk_upsert(pool, &records)
        .await
        .expect("Failed to seed tasks");

    Board::load_with_lists(pool, board.board)
        .await
        .expect("Failed to reload seeded board")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pools_are_isolated_copies_of_the_template() {
        let (first, _first_dir) = create_test_pool().await;
        let (second, _second_dir) = create_test_pool().await;

        seed_user(&first, "ada@example.com").await;

        let count = |pool: SqlitePool| async move {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(&pool)
                .await
                .unwrap()
        };
        assert_eq!(count(first).await, 1);
        assert_eq!(count(second).await, 0);
    }

    #[tokio::test]
    async fn seeded_board_has_tasks_in_order() {
        let (pool, _dir) = create_test_pool().await;
        let user_id = seed_user(&pool, "ada@example.com").await;

        let board = seed_board(&pool, user_id, &[&["a", "b"], &[], &["z"]]).await;

        let titles: Vec<Vec<&str>> = board
            .lists
            .iter()
            .map(|l| l.tasks.iter().map(|t| t.title.as_str()).collect())
            .collect();
        assert_eq!(titles, vec![vec!["a", "b"], vec![], vec!["z"]]);
        assert_eq!(board.user_id, user_id);
    }
}
