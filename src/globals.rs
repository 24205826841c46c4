use lazy_static::lazy_static;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Mutex;

use crate::errors::{DbError, DbResult};

// Global state definitions
lazy_static! {
    static ref INIT_MUTEX: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
    static ref DB_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);
}

pub fn get_db_pool() -> DbResult<SqlitePool> {
    DB_POOL
        .lock()
        .map_err(|_| DbError::ConnectionPool("DB_POOL lock poisoned".to_string()))?
        .clone()
        .ok_or_else(|| DbError::ConnectionPool("Database pool not initialized".to_string()))
}

/// Connect to the CRM database and keep the pool for the entry points.
/// Calling it again after a successful initialization is a no-op.
pub async fn initialize(database_url: &str) -> DbResult<()> {
    let _guard = INIT_MUTEX.lock().await;

    if get_db_pool().is_ok() {
        log::debug!("Database pool already initialized");
        return Ok(());
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DbError::ConnectionPool(format!("Invalid database URL {}: {}", database_url, e)))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| DbError::ConnectionPool(format!("Failed to connect to {}: {}", database_url, e)))?;

    let mut slot = DB_POOL
        .lock()
        .map_err(|_| DbError::ConnectionPool("DB_POOL lock poisoned".to_string()))?;
    *slot = Some(pool);

    log::info!("Database pool initialized for {}", database_url);
    Ok(())
}

