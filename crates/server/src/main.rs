use db::DBService;
use server::{AppState, file_logging, routes};
use services::services::config::{load_config_from_file, save_config_to_file};
use sqlx::Error as SqlxError;
use thiserror::Error;
use utils::assets::{asset_dir, config_path};

#[derive(Debug, Error)]
pub enum TaskflowError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
}

#[tokio::main]
async fn main() -> Result<(), TaskflowError> {
    dotenvy::dotenv().ok();

    // Held for the process lifetime so file logs are flushed.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _file_log_guard = file_logging::init_logging(&log_level);

    if !asset_dir().exists() {
        std::fs::create_dir_all(asset_dir())?;
    }

    let config_path = config_path();
    let config = load_config_from_file(&config_path).await;
    if let Err(e) = save_config_to_file(&config, &config_path).await {
        tracing::warn!("Failed to write config to {:?}: {}", config_path, e);
    }
    let config = config.with_env_overrides();

    let db = DBService::new().await?;
    let state = AppState::new(db.clone(), config);

    match state.auth().purge_inactive_sessions().await {
        Ok(count) if count > 0 => tracing::info!("Purged {} inactive session(s)", count),
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to purge inactive sessions: {}", e),
    }

    let app_router = routes::router(state);

    let port = std::env::var("BACKEND_PORT")
        .or_else(|_| std::env::var("PORT"))
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or_else(|| {
            tracing::info!("No PORT environment variable set, using port 0 for auto-assignment");
            0
        });

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();

    tracing::info!("Server running on http://{host}:{actual_port}");

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let terminate = async {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
            } else {
                tracing::error!("Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
