use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domains::settings::types::{ExportTarget, DEFAULT_TARGET};
use crate::errors::DbError;

/// Default number of contacts fetched per chunk
pub const DEFAULT_CHUNK_SIZE: u64 = 100;

/// Failure kinds of an export run
#[derive(Debug, Clone, Error, Serialize)]
pub enum ExportError {
    /// Export settings missing or unusable; raised while building the exporter
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The population count could not be determined
    #[error("No candidates: {0}")]
    NoCandidates(String),

    /// A chunk came back empty although the counted population was not exhausted
    #[error("No valid contacts found for export at offset {offset} of {total}")]
    ChunkIntegrity { offset: u64, total: u64 },

    /// Appending to the export artifact failed
    #[error("Error writing export file {path}: {message}")]
    Write { path: String, message: String },

    /// Handing the artifact to the transfer client failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// A chunk or relation query failed
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl ExportError {
    /// Stable code reported in the caller-facing envelope
    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::Configuration(_) => "configuration_error",
            ExportError::NoCandidates(_) => "no_candidates",
            ExportError::ChunkIntegrity { .. } => "chunk_integrity",
            ExportError::Write { .. } => "write_error",
            ExportError::Upload(_) => "upload_error",
            ExportError::Database(_) => "database_error",
        }
    }

    pub fn write(path: &Path, err: impl std::fmt::Display) -> Self {
        ExportError::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

/// One offset-addressed window of the candidate population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub offset: u64,
    pub size: u64,
}

/// Chunk descriptors covering `total` candidates, `size` at a time.
///
/// Yields `ceil(total / size)` descriptors; every offset is below `total`.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    total: u64,
    size: u64,
    next_offset: u64,
}

impl ChunkPlan {
    /// `size` must be positive
    pub fn new(total: u64, size: u64) -> Self {
        debug_assert!(size > 0, "chunk size must be positive");
        Self { total, size, next_offset: 0 }
    }

    pub fn chunk_count(&self) -> u64 {
        self.total.div_ceil(self.size)
    }
}

impl Iterator for ChunkPlan {
    type Item = ChunkDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_offset >= self.total {
            return None;
        }
        let chunk = ChunkDescriptor { offset: self.next_offset, size: self.size };
        self.next_offset = self.next_offset.saturating_add(self.size);
        Some(chunk)
    }
}

/// How the contact-id range of the relation joins is derived from a chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeMode {
    /// `range_start = offset`; the email, phone, address and group joins end at
    /// `(offset + size) - offset`, the survey join at `offset + size`.
    #[default]
    LegacyOffset,
    /// Every join spans the smallest to the largest contact id of the chunk
    ChunkIds,
}

impl FromStr for RangeMode {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy_offset" => Ok(RangeMode::LegacyOffset),
            "chunk_ids" => Ok(RangeMode::ChunkIds),
            other => Err(ExportError::Configuration(format!("Unknown range mode: {}", other))),
        }
    }
}

/// Inclusive contact-id bounds of one relation query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRange {
    pub range_start: i64,
    pub range_end: i64,
}

impl JoinRange {
    pub fn new(range_start: i64, range_end: i64) -> Self {
        Self { range_start, range_end }
    }

}

/// Ranges used for the joins of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRanges {
    /// Email, phone, address and group membership joins
    pub relations: JoinRange,
    /// Survey activity join
    pub activities: JoinRange,
}

impl ChunkRanges {
    pub fn for_chunk(chunk: ChunkDescriptor, mode: RangeMode, contact_ids: &[i64]) -> Self {
        match mode {
            RangeMode::LegacyOffset => {
                let start = i64::try_from(chunk.offset).unwrap_or(i64::MAX);
                let end = start.saturating_add(i64::try_from(chunk.size).unwrap_or(i64::MAX));
                Self {
                    relations: JoinRange::new(start, end - start),
                    activities: JoinRange::new(start, end),
                }
            }
            RangeMode::ChunkIds => {
                let range = match (contact_ids.iter().min(), contact_ids.iter().max()) {
                    (Some(&min), Some(&max)) => JoinRange::new(min, max),
                    _ => JoinRange::new(1, 0),
                };
                Self { relations: range, activities: range }
            }
        }
    }
}

/// The single output file of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub file_name: String,
    pub path: PathBuf,
    pub remote_destination: String,
    pub has_content: bool,
    /// `None` until an upload was attempted
    pub uploaded: Option<bool>,
    pub upload_error: Option<String>,
}

impl ExportArtifact {
    /// `<file>_<YYYYMMDDHHMMSS>.csv` inside `local_dir`, uploaded to `remote + file name`.
    ///
    /// When that name is already taken in `local_dir` a counter is appended
    /// (`<file>_<YYYYMMDDHHMMSS>_1.csv`, `_2`, ...), so a run never reuses the
    /// file of an earlier run started in the same second.
    pub fn create(target: &ExportTarget, local_dir: &Path, created_at: DateTime<Local>) -> Self {
        let stamp = created_at.format("%Y%m%d%H%M%S").to_string();
        let mut artifact = Self::named(target, local_dir, format!("{}_{}.csv", target.file, stamp));
        let mut counter = 1u32;
        while artifact.path.exists() {
            artifact = Self::named(target, local_dir, format!("{}_{}_{}.csv", target.file, stamp, counter));
            counter += 1;
        }
        artifact
    }

    fn named(target: &ExportTarget, local_dir: &Path, file_name: String) -> Self {
        Self {
            path: local_dir.join(&file_name),
            remote_destination: format!("{}{}", target.remote, file_name),
            file_name,
            has_content: false,
            uploaded: None,
            upload_error: None,
        }
    }
}

/// Export statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    pub rows_written: u64,
    pub bytes_written: u64,
    pub chunks_processed: u64,
    pub duration_ms: u64,
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub run_id: Uuid,
    pub export: String,
    pub total_candidates: u64,
    pub stats: ExportStats,
    pub artifact: ExportArtifact,
}

/// Process-level knobs of the exporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    pub chunk_size: u64,
    pub local_dir: PathBuf,
    pub range_mode: RangeMode,
    /// Name of the settings target to export to
    pub target: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            local_dir: std::env::temp_dir(),
            range_mode: RangeMode::default(),
            target: DEFAULT_TARGET.to_string(),
        }
    }
}
