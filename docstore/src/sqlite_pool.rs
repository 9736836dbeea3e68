//! SQLite connection pool wrapper for the document store.

use std::str::FromStr;

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::StoreConfig;

/// Manages a single SQLite pool; creates the database file if missing.
#[derive(Clone)]
pub struct SqlitePoolManager {
    pool: SqlitePool,
}

impl SqlitePoolManager {
    /// Creates a pool for the configured database URL (`sqlite:` URL or plain file path).
    pub async fn new(config: &StoreConfig) -> Result<Self, sqlx::Error> {
        info!(
            "Initializing SQLite pool: {} (max_connections={})",
            config.database_url, config.max_connections
        );

        let options = connect_options(&config.database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Wraps a pool the caller already owns.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    if database_url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database_url)
    } else {
        Ok(SqliteConnectOptions::new().filename(database_url))
    }
}
