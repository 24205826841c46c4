use async_trait::async_trait;
use chrono::{DateTime, Local};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::domains::settings::repository::SettingsRepository;
use crate::domains::settings::types::ExportTarget;

use super::csv_record::CsvRecord;
use super::upload::{TransferClient, UploadHandoff};
use super::writer::IncrementalCsvWriter;
use super::types::{
    ChunkDescriptor, ChunkPlan, ExportArtifact, ExportError, ExportOutcome, ExportResult,
    ExportStats, ExporterConfig,
};

/// What varies between batch exports: population, joins and row shape.
///
/// Writing, chunking and the upload are owned by [`BatchExporter`].
#[async_trait]
pub trait ExportVariant: Send + Sync {
    type Record: Send + Sync;
    type Join: Send + Sync;
    type Row: CsvRecord + Send + Sync;

    /// Short name used in logs and the outcome
    fn name(&self) -> &str;

    /// Settings record holding this export's targets
    fn settings_name(&self) -> &str;

    /// Size of the candidate population; failures surface as `NoCandidates`
    async fn count(&self) -> ExportResult<u64>;

    async fn select_chunk(&self, chunk: ChunkDescriptor) -> ExportResult<Vec<Self::Record>>;

    async fn join(&self, chunk: ChunkDescriptor, records: &[Self::Record]) -> ExportResult<Self::Join>;

    fn transform(&self, record: &Self::Record, join: &Self::Join) -> Self::Row;
}

/// State owned by a single run
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub total_candidates: u64,
    pub chunks_processed: u64,
    clock: Instant,
    writer: IncrementalCsvWriter,
}

impl RunContext {
    fn new(target: &ExportTarget, config: &ExporterConfig) -> Self {
        let started_at = Local::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            total_candidates: 0,
            chunks_processed: 0,
            clock: Instant::now(),
            writer: IncrementalCsvWriter::new(ExportArtifact::create(target, &config.local_dir, started_at)),
        }
    }

    pub fn artifact(&self) -> &ExportArtifact {
        self.writer.artifact()
    }

    fn finish(self) -> (ExportStats, ExportArtifact) {
        let stats = ExportStats {
            rows_written: self.writer.rows_written(),
            bytes_written: self.writer.bytes_written(),
            chunks_processed: self.chunks_processed,
            duration_ms: u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        (stats, self.writer.into_artifact())
    }
}

/// Chunked export driver: count once, then select, join, transform and
/// append chunk by chunk, and hand the file to the transfer client at the end.
pub struct BatchExporter<V: ExportVariant> {
    variant: V,
    target: ExportTarget,
    config: ExporterConfig,
    upload: UploadHandoff,
}

impl<V: ExportVariant> BatchExporter<V> {
    /// Resolves the export target from the settings; a missing record or
    /// target is a configuration error.
    pub async fn new(
        variant: V,
        settings: &dyn SettingsRepository,
        transfer: Arc<dyn TransferClient>,
        config: ExporterConfig,
    ) -> ExportResult<Self> {
        if config.chunk_size == 0 {
            return Err(ExportError::Configuration("Chunk size must be positive".to_string()));
        }

        let settings_name = variant.settings_name();
        let export_settings = settings
            .export_settings(settings_name)
            .await
            .map_err(|e| ExportError::Configuration(format!("Failed to load settings {}: {}", settings_name, e)))?
            .ok_or_else(|| ExportError::Configuration(format!("Settings {} not found", settings_name)))?;

        let target = export_settings
            .target(&config.target)
            .cloned()
            .ok_or_else(|| {
                ExportError::Configuration(format!("Settings {} have no '{}' target", settings_name, config.target))
            })?;

        Ok(Self {
            variant,
            target,
            config,
            upload: UploadHandoff::new(transfer),
        })
    }

    pub async fn run(&self) -> ExportResult<ExportOutcome> {
        let mut ctx = RunContext::new(&self.target, &self.config);
        info!(
            "[{}] Starting {} export to {}",
            ctx.run_id,
            self.variant.name(),
            ctx.artifact().path.display()
        );

        if let Err(e) = self.process(&mut ctx).await {
            error!(
                "[{}] {} export aborted after {} chunks ({} rows written): {}",
                ctx.run_id,
                self.variant.name(),
                ctx.chunks_processed,
                ctx.writer.rows_written(),
                e
            );
            return Err(e);
        }

        let run_id = ctx.run_id;
        let total_candidates = ctx.total_candidates;
        let (stats, mut artifact) = ctx.finish();
        self.upload.hand_off(&mut artifact).await;

        info!(
            "[{}] {} export finished: {} rows in {} chunks, {} bytes, {} ms",
            run_id,
            self.variant.name(),
            stats.rows_written,
            stats.chunks_processed,
            stats.bytes_written,
            stats.duration_ms
        );

        Ok(ExportOutcome {
            run_id,
            export: self.variant.name().to_string(),
            total_candidates,
            stats,
            artifact,
        })
    }

    async fn process(&self, ctx: &mut RunContext) -> ExportResult<()> {
        let total = self.variant.count().await?;
        ctx.total_candidates = total;

        let plan = ChunkPlan::new(total, self.config.chunk_size);
        info!("[{}] {} candidates in {} chunks", ctx.run_id, total, plan.chunk_count());

        for chunk in plan {
            let records = self.variant.select_chunk(chunk).await?;
            if records.is_empty() {
                return Err(ExportError::ChunkIntegrity { offset: chunk.offset, total });
            }
            debug!("[{}] Chunk at offset {} returned {} records", ctx.run_id, chunk.offset, records.len());

            let join = self.variant.join(chunk, &records).await?;
            for record in &records {
                let row = self.variant.transform(record, &join);
                ctx.writer.append_row(&row).await?;
            }
            ctx.chunks_processed += 1;
        }

        Ok(())
    }
}
