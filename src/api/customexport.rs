use chrono::Local;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::ProcessConfig;
use crate::domains::contact::repository::SqliteCrmRepository;
use crate::domains::export::checksum::ContactChecksum;
use crate::domains::export::service::BatchExporter;
use crate::domains::export::types::{ExportOutcome, ExportResult, RangeMode};
use crate::domains::export::upload::SchemeTransferClient;
use crate::domains::export::versandtool::VersandtoolExport;
use crate::domains::settings::repository::SqliteSettingsRepository;
use crate::globals;

use super::ExportResponse;

pub const VERSANDTOOL_DEFAULT_ERROR: &str = "An error occurred during Versandtool Export";

/// Optional per-call overrides of the process configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersandtoolParams {
    pub chunk_size: Option<u64>,
    pub target: Option<String>,
    pub range_mode: Option<RangeMode>,
}

/// Run the Versandtool export against the global database pool
pub async fn versandtool(params: VersandtoolParams) -> ExportResponse {
    ExportResponse::from_result(run_versandtool(params).await, VERSANDTOOL_DEFAULT_ERROR)
}

async fn run_versandtool(params: VersandtoolParams) -> ExportResult<ExportOutcome> {
    let pool = globals::get_db_pool()?;
    let process = ProcessConfig::from_env()?;
    versandtool_with_pool(pool, &process, params).await
}

pub async fn versandtool_with_pool(
    pool: SqlitePool,
    process: &ProcessConfig,
    params: VersandtoolParams,
) -> ExportResult<ExportOutcome> {
    let mut config = process.exporter.clone();
    if let Some(chunk_size) = params.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(target) = params.target {
        config.target = target;
    }
    if let Some(range_mode) = params.range_mode {
        config.range_mode = range_mode;
    }

    // One issue timestamp for every checksum of the run
    let checksum = ContactChecksum::new(
        process.site_key.clone(),
        Local::now().timestamp(),
        process.checksum_live_hours,
    );
    let variant = VersandtoolExport::new(
        Arc::new(SqliteCrmRepository::new(pool.clone())),
        Arc::new(checksum),
        config.range_mode,
    );
    let settings = SqliteSettingsRepository::new(pool);

    let exporter = BatchExporter::new(variant, &settings, Arc::new(SchemeTransferClient::new()?), config).await?;
    exporter.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::export::types::ExporterConfig;
    use crate::test_support::{memory_pool, seed_contact, seed_export_settings, ContactSeed};

    fn process_config(local_dir: &std::path::Path) -> ProcessConfig {
        ProcessConfig {
            database_url: "sqlite::memory:".to_string(),
            exporter: ExporterConfig {
                local_dir: local_dir.to_path_buf(),
                ..Default::default()
            },
            site_key: "site-key".to_string(),
            checksum_live_hours: 24,
        }
    }

    #[tokio::test]
    async fn test_params_override_chunk_size() {
        let pool = memory_pool().await;
        for id in 1..=5 {
            seed_contact(&pool, ContactSeed::individual(id)).await;
        }
        let local = tempfile::tempdir().unwrap();
        seed_export_settings(&pool, "versandtool", "sftp://transfer.example.org/inbox/").await;

        let params = VersandtoolParams { chunk_size: Some(2), ..Default::default() };
        let response = ExportResponse::from_result(
            versandtool_with_pool(pool, &process_config(local.path()), params).await,
            VERSANDTOOL_DEFAULT_ERROR,
        );

        assert!(!response.is_error);
        let values = response.values.unwrap();
        assert_eq!(values["export"], "versandtool");
        assert_eq!(values["stats"]["chunks_processed"], 3);
        assert_eq!(values["stats"]["rows_written"], 5);
        assert_eq!(values["artifact"]["uploaded"], false);
    }

    #[tokio::test]
    async fn test_missing_settings_reported_in_envelope() {
        let pool = memory_pool().await;
        let local = tempfile::tempdir().unwrap();

        let response = ExportResponse::from_result(
            versandtool_with_pool(pool, &process_config(local.path()), VersandtoolParams::default()).await,
            VERSANDTOOL_DEFAULT_ERROR,
        );
        assert!(response.is_error);
        assert_eq!(response.error_code.as_deref(), Some("configuration_error"));
    }

    #[tokio::test]
    async fn test_uninitialized_pool_is_database_error() {
        let response = versandtool(VersandtoolParams::default()).await;
        assert!(response.is_error);
        assert_eq!(response.error_code.as_deref(), Some("database_error"));
    }
}
