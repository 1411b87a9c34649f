pub mod auth_session;
pub mod board;
pub mod list;
pub mod task;
pub mod user;
