//! `PostgreSQL` adapter for the outbox.

mod models;
mod repository;
mod schema;

pub use repository::PostgresOutbox;
