//! Database module - PostgreSQL connection pool and schema bootstrap

use sqlx::{postgres::PgPoolOptions, Executor, PgPool, Postgres, Transaction};
use std::time::Duration;
use tourney_common::{config::DatabaseConfig, retry::{retry_with_backoff, RetryPolicy}};
use tracing::{debug, info, instrument, warn};

use crate::{Error, Result};

const SCHEMA: &str = include_str!("../migrations/0001_tournament_schema.sql");

/// Database connection pool wrapper with health monitoring.
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Create a new database pool with the given configuration.
    ///
    /// The initial connection is retried a few times so the worker can start
    /// alongside a database that is still booting.
    #[instrument(skip(config), fields(pool_size = config.pool_size))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Initializing database connection pool");

        let pool = retry_with_backoff(RetryPolicy::exponential(3), || {
            PgPoolOptions::new()
                .max_connections(config.pool_size)
                .acquire_timeout(config.timeout())
                .after_connect(|conn, _meta| {
                    Box::pin(async move {
                        sqlx::query("SET timezone = 'UTC'").execute(&mut *conn).await?;
                        Ok(())
                    })
                })
                .connect(&config.url)
        })
        .await
        .map_err(Error::Database)?;

        info!("Database pool initialized successfully");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get reference to the underlying pool.
    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a new database transaction.
    #[instrument(skip(self))]
    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        debug!("Beginning new transaction");
        self.pool.begin().await.map_err(Error::Database)
    }

    /// Create the tournament, participant and match tables if missing.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<()> {
        // Simple-query protocol, so the multi-statement script runs as one call
        self.pool.execute(SCHEMA).await.map_err(Error::Database)?;
        info!("Database schema ensured");
        Ok(())
    }

    /// Check database health by executing a simple query.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthStatus {
        let start = std::time::Instant::now();

        let error = match sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
        {
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Health check failed");
                Some(e.to_string())
            }
        };

        HealthStatus {
            healthy: error.is_none(),
            latency: start.elapsed(),
            pool_size: self.pool.size(),
            error,
        }
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("size", &self.pool.size())
            .field("idle", &self.pool.num_idle())
            .finish()
    }
}

/// Health status for database connections.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the database is healthy
    pub healthy: bool,
    /// Query latency
    pub latency: Duration,
    /// Current pool size
    pub pool_size: u32,
    /// Error message if unhealthy
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defines_every_table() {
        for table in ["tournaments", "tournament_participants", "matches"] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {}", table)),
                "missing table {}",
                table
            );
        }
        assert!(SCHEMA.contains("PRIMARY KEY (tournament_id, number)"));
    }
}
