use std::env;
use std::path::PathBuf;

use crate::domains::export::checksum::DEFAULT_CHECKSUM_LIVE_HOURS;
use crate::domains::export::types::{ExportError, ExportResult, ExporterConfig, RangeMode};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://crm.sqlite";

/// Process-level settings read from the environment (`.env` is loaded by the binary)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    /// `CRM_DATABASE_URL`
    pub database_url: String,
    /// `EXPORT_LOCAL_DIR`, `EXPORT_CHUNK_SIZE`, `EXPORT_RANGE_MODE`
    pub exporter: ExporterConfig,
    /// `EXPORT_SITE_KEY`
    pub site_key: String,
    /// `EXPORT_CHECKSUM_LIVE_HOURS`
    pub checksum_live_hours: u32,
}

impl ProcessConfig {
    pub fn from_env() -> ExportResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ExportResult<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = ExporterConfig::default();

        let chunk_size = match get("EXPORT_CHUNK_SIZE") {
            Some(raw) => parse_number::<u64>("EXPORT_CHUNK_SIZE", &raw)?,
            None => defaults.chunk_size,
        };
        if chunk_size == 0 {
            return Err(ExportError::Configuration("EXPORT_CHUNK_SIZE must be positive".to_string()));
        }

        let range_mode = match get("EXPORT_RANGE_MODE") {
            Some(raw) => raw.parse::<RangeMode>()?,
            None => defaults.range_mode,
        };

        let checksum_live_hours = match get("EXPORT_CHECKSUM_LIVE_HOURS") {
            Some(raw) => parse_number::<u32>("EXPORT_CHECKSUM_LIVE_HOURS", &raw)?,
            None => DEFAULT_CHECKSUM_LIVE_HOURS,
        };

        let site_key = get("EXPORT_SITE_KEY").unwrap_or_else(|| {
            log::warn!("EXPORT_SITE_KEY is not set, contact checksums use an empty key");
            String::new()
        });

        Ok(Self {
            database_url: get("CRM_DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            exporter: ExporterConfig {
                chunk_size,
                local_dir: get("EXPORT_LOCAL_DIR").map(PathBuf::from).unwrap_or(defaults.local_dir),
                range_mode,
                target: defaults.target,
            },
            site_key,
            checksum_live_hours,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> ExportResult<T> {
    raw.parse::<T>()
        .map_err(|_| ExportError::Configuration(format!("{} is not a valid number: {}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ExportResult<ProcessConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ProcessConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.exporter, ExporterConfig::default());
        assert_eq!(config.checksum_live_hours, 168);
        assert_eq!(config.site_key, "");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CRM_DATABASE_URL", "sqlite:///var/lib/crm/crm.sqlite"),
            ("EXPORT_LOCAL_DIR", "/var/spool/export"),
            ("EXPORT_CHUNK_SIZE", "500"),
            ("EXPORT_RANGE_MODE", "chunk_ids"),
            ("EXPORT_SITE_KEY", "k3y"),
            ("EXPORT_CHECKSUM_LIVE_HOURS", "24"),
        ])
        .unwrap();

        assert_eq!(config.database_url, "sqlite:///var/lib/crm/crm.sqlite");
        assert_eq!(config.exporter.local_dir, PathBuf::from("/var/spool/export"));
        assert_eq!(config.exporter.chunk_size, 500);
        assert_eq!(config.exporter.range_mode, RangeMode::ChunkIds);
        assert_eq!(config.site_key, "k3y");
        assert_eq!(config.checksum_live_hours, 24);
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        for vars in [
            [("EXPORT_CHUNK_SIZE", "lots")],
            [("EXPORT_CHUNK_SIZE", "0")],
            [("EXPORT_RANGE_MODE", "by_magic")],
            [("EXPORT_CHECKSUM_LIVE_HOURS", "-1")],
        ] {
            assert!(matches!(config_from(&vars), Err(ExportError::Configuration(_))), "{:?}", vars);
        }
    }
}
