use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

/// Root directory for the database, config and logs.
///
/// Debug builds keep everything under `dev_assets/` in the workspace so a
/// development server never touches the user's real data.
pub fn asset_dir() -> PathBuf {
    let path = if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("app", "taskflow", "taskflow")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("taskflow"))
    };

    if !path.exists()
        && let Err(e) = std::fs::create_dir_all(&path)
    {
        tracing::warn!(path = %path.display(), error = %e, "Failed to create asset directory");
    }

    path
}

/// Get the configuration directory path.
///
/// Respects `TASKFLOW_CONFIG_DIR` (tilde expansion supported).
///
/// Default: `{asset_dir}`
pub fn config_dir() -> PathBuf {
    if let Ok(path) = std::env::var("TASKFLOW_CONFIG_DIR") {
        let expanded = crate::path::expand_tilde(&path);
        if !expanded.exists()
            && let Err(e) = std::fs::create_dir_all(&expanded)
        {
            tracing::warn!(path = %expanded.display(), error = %e, "Failed to create config directory");
        }
        return expanded;
    }
    asset_dir()
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Get the database file path.
///
/// Respects `TASKFLOW_DATABASE_PATH` (tilde expansion supported).
///
/// Default: `{asset_dir}/db.sqlite`
pub fn database_path() -> PathBuf {
    if let Ok(path) = std::env::var("TASKFLOW_DATABASE_PATH") {
        return crate::path::expand_tilde(&path);
    }
    asset_dir().join("db.sqlite")
}
