//! `PostgreSQL` adapters for task lifecycle persistence.

mod models;
mod repository;
mod schema;

pub use repository::{DEFAULT_POLL_INTERVAL, PostgresTaskRepository};
