use sqlx::SqlitePool;

use crate::errors::{DbError, DbResult};
use crate::globals;

// Embed all migration SQL files at compile time
const MIGRATION_CRM_SCHEMA: &str = include_str!("../migrations/20261001000000_crm_schema.sql");

// List of migrations with their names and SQL content
const MIGRATIONS: &[(&str, &str)] = &[
    ("20261001000000_crm_schema.sql", MIGRATION_CRM_SCHEMA),
];

/// Apply pending migrations to the globally configured database
pub async fn initialize_database() -> DbResult<()> {
    let pool = globals::get_db_pool()?;
    apply_migrations(&pool).await
}

/// Apply every migration newer than the last recorded one
pub async fn apply_migrations(pool: &SqlitePool) -> DbResult<()> {
    create_migrations_table(pool).await?;

    let last_migration = get_last_migration(pool).await?;
    match &last_migration {
        Some(name) => log::debug!("Last applied migration: {}", name),
        None => log::debug!("No migrations applied yet"),
    }

    let pending = get_pending_migrations(last_migration.as_deref());
    if pending.is_empty() {
        log::debug!("No pending migrations to apply");
        return Ok(());
    }

    let mut tx = pool.begin().await
        .map_err(|e| DbError::Migration(format!("Failed to begin transaction: {}", e)))?;

    for (migration_name, migration_sql) in pending {
        log::info!("Applying migration {}", migration_name);

        sqlx::query(migration_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("Failed to apply migration {}: {}", migration_name, e)))?;

        sqlx::query("INSERT INTO migrations (name, applied_at) VALUES (?, ?)")
            .bind(migration_name)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("Failed to record migration {}: {}", migration_name, e)))?;
    }

    tx.commit().await
        .map_err(|e| DbError::Migration(format!("Failed to commit migrations: {}", e)))?;

    Ok(())
}

async fn create_migrations_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await
    .map_err(|e| DbError::Migration(format!("Failed to create migrations table: {}", e)))?;

    Ok(())
}

async fn get_last_migration(pool: &SqlitePool) -> DbResult<Option<String>> {
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM migrations ORDER BY id DESC LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(|e| DbError::Migration(format!("Failed to get last migration: {}", e)))?;
    Ok(name)
}

/// Migrations listed after `last_migration`, or all of them when nothing was applied
fn get_pending_migrations(last_migration: Option<&str>) -> Vec<(&'static str, &'static str)> {
    let mut pending = Vec::new();
    let mut should_include = last_migration.is_none();

    for &(migration_name, migration_sql) in MIGRATIONS {
        if should_include {
            pending.push((migration_name, migration_sql));
        } else if Some(migration_name) == last_migration {
            should_include = true;
        }
    }

    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_pending_migrations() {
        assert_eq!(get_pending_migrations(None).len(), MIGRATIONS.len());
        assert!(get_pending_migrations(Some("20261001000000_crm_schema.sql")).is_empty());
    }

    #[tokio::test]
    async fn test_apply_migrations_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        apply_migrations(&pool).await.unwrap();
        apply_migrations(&pool).await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, 1);
    }
}
