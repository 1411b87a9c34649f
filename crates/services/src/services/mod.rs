//! Service layer for TaskFlow.
//!
//! - [`board_state`] / [`drag`] / [`reconciler`]: the in-memory board snapshot and
//!   the drag-and-drop reconciliation engine built on it
//! - [`task_store`] / [`board_client`]: where reconciled task rows are persisted
//! - [`board`] / [`auth`]: request-level operations used by the HTTP server

pub mod auth;
pub mod board;
pub mod board_client;
pub mod board_state;
pub mod config;
pub mod drag;
pub mod notification;
pub mod reconciler;
pub mod task_store;
