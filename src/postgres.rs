//! Shared plumbing for the `PostgreSQL` adapters.
//!
//! Diesel connections are synchronous, so every adapter call is offloaded to
//! Tokio's blocking pool with [`run_blocking`].

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use thiserror::Error;
use tokio::task::JoinError;

/// `PostgreSQL` connection pool shared by all adapters.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Failure to obtain a connection or to join the blocking task.
#[derive(Debug, Error)]
pub enum BlockingError {
    /// No connection could be checked out of the pool.
    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),

    /// The blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] JoinError),
}

/// Runs `operation` with a pooled connection on the blocking thread pool.
///
/// # Errors
///
/// Returns the operation's own error, or a [`BlockingError`] converted into
/// the caller's error type.
pub async fn run_blocking<F, T, E>(pool: &PgPool, operation: F) -> Result<T, E>
where
    F: FnOnce(&mut PgConnection) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<BlockingError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get().map_err(|err| E::from(BlockingError::Pool(err)))?;
        operation(&mut connection)
    })
    .await
    .map_err(|err| E::from(BlockingError::Join(err)))?
}
