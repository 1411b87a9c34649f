pub mod auth;
pub mod model_loaders;

pub use auth::{SESSION_COOKIE, extract_session_token, require_session};
pub use model_loaders::load_board_middleware;
