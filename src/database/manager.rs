use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map a failed INSERT/UPDATE, turning unique violations into `Conflict`
    pub fn on_write(err: sqlx::Error, conflict_message: impl Into<String>) -> Self {
        let is_unique_violation = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code == UNIQUE_VIOLATION)
            .unwrap_or(false);

        if is_unique_violation {
            DatabaseError::Conflict(conflict_message.into())
        } else {
            DatabaseError::Sqlx(err)
        }
    }

    /// True when the pool could not reach the server at all
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
                | DatabaseError::Sqlx(sqlx::Error::Io(_))
                | DatabaseError::Sqlx(sqlx::Error::PoolClosed)
        )
    }
}

/// Connection pool construction, migrations and liveness checks
pub struct DatabaseManager;

impl DatabaseManager {
    /// Build the pool without opening a connection; the first query connects.
    /// Lets the server start (and report a degraded /health) while the
    /// database is still coming up.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_lazy(&config.url)?;

        info!(max_connections = config.max_connections, "Configured database pool");
        Ok(pool)
    }

    /// Apply the embedded migrations under ./migrations
    pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_conflicts() {
        let err = DatabaseError::on_write(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(err, DatabaseError::Sqlx(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn pool_timeouts_count_as_unavailable() {
        assert!(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(!DatabaseError::NotFound("x".into()).is_unavailable());
    }

    #[tokio::test]
    async fn lazy_pool_builds_without_a_server() {
        let config = DatabaseConfig {
            url: "postgres://nobody@127.0.0.1:1/none".to_string(),
            max_connections: 1,
            connection_timeout: 1,
        };
        assert!(DatabaseManager::connect_lazy(&config).is_ok());
    }
}
