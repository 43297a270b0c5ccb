//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStore;
#[cfg(feature = "mysql")]
pub use mysql::MysqlStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

#[cfg(any(feature = "mysql", feature = "postgres"))]
use crate::core::error::StoreError;

/// Sort a sqlx failure into the store error kinds the services branch on
///
/// Connection-level failures become `Unavailable`, constraint violations
/// become `Constraint`, everything else is a `Query` error.
#[cfg(any(feature = "mysql", feature = "postgres"))]
pub(crate) fn map_sqlx_error(backend: &'static str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::unavailable(backend, err.to_string()),
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation() =>
        {
            StoreError::constraint(backend, db.message())
        }
        _ => StoreError::query(backend, err.to_string()),
    }
}

/// Build sqlx pool options from the database section of the configuration
#[cfg(any(feature = "mysql", feature = "postgres"))]
pub(crate) fn pool_options<DB: sqlx::Database>(
    config: &crate::config::DatabaseConfig,
) -> sqlx::pool::PoolOptions<DB> {
    sqlx::pool::PoolOptions::<DB>::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true)
}
