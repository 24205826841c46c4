use async_trait::async_trait;
use sqlx::{query_scalar, SqlitePool};

use crate::errors::{DbError, DbResult};

use super::types::ExportSettings;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Export settings stored under `name`; `None` when the record is absent or empty
    async fn export_settings(&self, name: &str) -> DbResult<Option<ExportSettings>>;
}

pub struct SqliteSettingsRepository {
    pool: SqlitePool,
}

impl SqliteSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for SqliteSettingsRepository {
    async fn export_settings(&self, name: &str) -> DbResult<Option<ExportSettings>> {
        let value: Option<Option<String>> = query_scalar("SELECT value FROM civicrm_setting WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(raw) = value.flatten().filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };

        let settings = serde_json::from_str::<ExportSettings>(&raw)
            .map_err(|e| DbError::Query(format!("Setting {} is not valid JSON: {}", name, e)))?;
        Ok(Some(settings))
    }
}
