//! Client for the task-scheduler API: a local copy of the user's tasks, the
//! views and statistics derived from it, and the HTTP calls that keep it in
//! sync with the server.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod notice;
pub mod projection;
pub mod render;
pub mod session;
pub mod task;
pub mod task_store;

pub use error::{Error, Result};
