use std::sync::Arc;

use db::DBService;
use services::services::{
    auth::AuthService,
    board::BoardService,
    config::Config,
    notification::{Notifier, TracingNotifier},
};

pub mod error;
pub mod file_logging;
pub mod middleware;
pub mod routes;

/// Shared handles injected into every route.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    config: Arc<Config>,
    auth: AuthService,
    boards: BoardService,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(db: DBService, config: Config) -> Self {
        let auth = AuthService::new(db.pool.clone(), &config);
        let boards = BoardService::new(db.pool.clone());
        Self {
            db,
            config: Arc::new(config),
            auth,
            boards,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replace the auth service, e.g. to lower the password hashing cost.
    pub fn with_auth(mut self, auth: AuthService) -> Self {
        self.auth = auth;
        self
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn boards(&self) -> &BoardService {
        &self.boards
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }
}
