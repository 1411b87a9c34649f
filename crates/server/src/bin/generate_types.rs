//! Writes the TypeScript declarations of every API type to `shared/types.ts`.
//!
//! Pass `--check` to fail instead of writing when the file is out of date.

use std::path::PathBuf;

use anyhow::{Context, bail};
use ts_rs::TS;

fn declarations() -> Vec<String> {
    vec![
        db::models::user::User::decl(),
        db::models::board::Board::decl(),
        db::models::board::CreateBoard::decl(),
        db::models::board::BoardWithLists::decl(),
        db::models::list::List::decl(),
        db::models::list::ListWithTasks::decl(),
        db::models::task::Task::decl(),
        db::models::task::CreateTask::decl(),
        db::models::task::TaskRecord::decl(),
        services::services::auth::SignupRequest::decl(),
        services::services::auth::LoginRequest::decl(),
        services::services::auth::LoginResponse::decl(),
        services::services::auth::SessionInfo::decl(),
        services::services::board::BulkUpsertResponse::decl(),
        services::services::board::MoveResponse::decl(),
        services::services::drag::DragEvent::decl(),
        services::services::drag::DropTarget::decl(),
        services::services::drag::MoveKind::decl(),
        services::services::notification::NotificationLevel::decl(),
        services::services::notification::Notification::decl(),
        services::services::config::MoveFailurePolicy::decl(),
        services::services::config::Config::decl(),
    ]
}

fn render() -> String {
    let mut out = String::from(
        "// This file was generated by `cargo run --bin generate_types`. Do not edit.\n\n",
    );
    for decl in declarations() {
        out.push_str("export ");
        out.push_str(&decl);
        out.push_str("\n\n");
    }
    out
}

fn main() -> anyhow::Result<()> {
    let check = std::env::args().any(|a| a == "--check");
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    let contents = render();

    if check {
        let current = std::fs::read_to_string(&path).unwrap_or_default();
        if current != contents {
            bail!("{} is out of date; run generate_types", path.display());
        }
        println!("{} is up to date", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
