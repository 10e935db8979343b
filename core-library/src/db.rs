//! # Database Connection Pool Module
//!
//! Provides SQLite connection pooling with configuration suited to the
//! mirror's write pattern (many small batched writes, occasional scans).
//!
//! ## Features
//!
//! - **WAL Mode**: Enabled for better concurrency (multiple readers, one writer)
//! - **Connection Pooling**: Configurable min/max connections with timeouts
//! - **Foreign Keys**: Enforced
//! - **Inline Schema**: Each repository creates its own table on
//!   `initialize()`; [`initialize_store`] runs them all
//! - **Health Checks**: Connection validation on pool creation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, initialize_store, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("podmirror.db")).await?;
//! initialize_store(&pool).await?;
//! ```
//!
//! For tests, use in-memory databases:
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::error::Result;
use crate::repositories::{
    SqliteBookmarkRepository, SqliteEpisodeRepository, SqlitePodcastRepository,
    SqliteSyncProgressRepository,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database configuration for the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or `:memory:` for an in-memory database
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a new database configuration for the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Set the minimum number of connections
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool.
///
/// Configures WAL journaling, foreign keys and pool sizing, then performs a
/// health check. Schema creation is separate; call [`initialize_store`]
/// afterwards.
///
/// # Errors
///
/// Returns an error if the database file cannot be accessed, pool creation
/// fails or the health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        // WAL mode for better concurrency
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL synchronous mode for a good balance of safety and speed
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true);

    debug!("SQLite connection options configured");

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            e
        })?;

    health_check(&pool).await?;

    info!(
        connections = pool.size(),
        "Database connection pool created successfully"
    );

    Ok(pool)
}

/// Initialize every repository's schema on the given pool.
///
/// Safe to call repeatedly; all statements are `IF NOT EXISTS`.
pub async fn initialize_store(pool: &Pool<Sqlite>) -> Result<()> {
    SqliteEpisodeRepository::new(pool.clone()).initialize().await?;
    SqlitePodcastRepository::new(pool.clone()).initialize().await?;
    SqliteBookmarkRepository::new(pool.clone()).initialize().await?;
    SqliteSyncProgressRepository::new(pool.clone())
        .initialize()
        .await?;

    info!("Store schema initialized");
    Ok(())
}

/// Create a connection pool for testing with an in-memory database.
///
/// The schema is already initialized on the returned pool.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    let pool = create_pool(DatabaseConfig::in_memory()).await?;
    initialize_store(&pool).await?;
    Ok(pool)
}

/// Perform a health check on the connection pool
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    debug!("Performing database health check");

    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        e
    })?;

    debug!("Database health check passed");
    Ok(())
}
