//! Fixtures shared by the database-backed tests.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::db_migration;
use crate::domains::settings::types::VERSANDTOOL_EXPORTS;

/// Single-connection in-memory database with the schema applied.
/// One connection keeps every query on the same in-memory database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db_migration::apply_migrations(&pool).await.unwrap();
    pool
}

#[derive(Debug, Clone)]
pub struct ContactSeed {
    pub id: i64,
    pub contact_type: &'static str,
    pub hash: Option<&'static str>,
    pub first_name: Option<&'static str>,
    pub last_name: Option<&'static str>,
    pub external_identifier: Option<String>,
    pub do_not_email: bool,
    pub is_opt_out: bool,
    pub is_deleted: bool,
}

impl ContactSeed {
    /// An exportable individual
    pub fn individual(id: i64) -> Self {
        Self {
            id,
            contact_type: "Individual",
            hash: Some("c0ffee"),
            first_name: Some("Anna"),
            last_name: Some("de Vries"),
            external_identifier: None,
            do_not_email: false,
            is_opt_out: false,
            is_deleted: false,
        }
    }
}

pub async fn seed_contact(pool: &SqlitePool, seed: ContactSeed) {
    sqlx::query(
        "INSERT INTO civicrm_contact
            (id, contact_type, hash, first_name, last_name, external_identifier, do_not_email, is_opt_out, is_deleted)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(seed.id)
    .bind(seed.contact_type)
    .bind(seed.hash)
    .bind(seed.first_name)
    .bind(seed.last_name)
    .bind(seed.external_identifier)
    .bind(seed.do_not_email)
    .bind(seed.is_opt_out)
    .bind(seed.is_deleted)
    .execute(pool)
    .await
    .unwrap();
}

/// Store a `default` export target under the Versandtool settings record
pub async fn seed_export_settings(pool: &SqlitePool, file: &str, remote: &str) {
    let value = serde_json::json!({
        "default": { "file": file, "remote": remote }
    });
    sqlx::query("INSERT INTO civicrm_setting (name, value) VALUES (?, ?)")
        .bind(VERSANDTOOL_EXPORTS)
        .bind(value.to_string())
        .execute(pool)
        .await
        .unwrap();
}
