use csv::{QuoteStyle, Terminator};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use super::csv_record::CsvRecord;
use super::types::{ExportArtifact, ExportError, ExportResult};

/// Appends rows to the export artifact, one locked append per call.
///
/// The header is written exactly once, right before the first row, and
/// `has_content` on the artifact flips to true with it. The first append
/// creates the file and fails if it already exists. Nothing is buffered
/// between calls and failed writes are not retried.
pub struct IncrementalCsvWriter {
    artifact: ExportArtifact,
    created: bool,
    rows_written: u64,
    bytes_written: u64,
}

impl IncrementalCsvWriter {
    pub fn new(artifact: ExportArtifact) -> Self {
        Self {
            artifact,
            created: false,
            rows_written: 0,
            bytes_written: 0,
        }
    }

    pub fn artifact(&self) -> &ExportArtifact {
        &self.artifact
    }

    pub fn into_artifact(self) -> ExportArtifact {
        self.artifact
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub async fn append_row<R: CsvRecord>(&mut self, row: &R) -> ExportResult<()> {
        if !self.artifact.has_content {
            let header = encode_record(R::headers()).map_err(|e| ExportError::write(&self.artifact.path, e))?;
            self.append(header).await?;
            self.artifact.has_content = true;
        }

        let line = encode_record(row.to_csv()).map_err(|e| ExportError::write(&self.artifact.path, e))?;
        self.append(line).await?;
        self.rows_written += 1;
        Ok(())
    }

    async fn append(&mut self, bytes: Vec<u8>) -> ExportResult<()> {
        let path = self.artifact.path.clone();
        let len = bytes.len() as u64;
        let create_new = !self.created;

        tokio::task::spawn_blocking(move || append_locked(&path, &bytes, create_new))
            .await
            .map_err(|e| ExportError::write(&self.artifact.path, e))?
            .map_err(|e| ExportError::write(&self.artifact.path, e))?;

        self.created = true;
        self.bytes_written += len;
        Ok(())
    }
}

/// One CSV line, quoted where a field holds a comma, quote or line break
fn encode_record<I, T>(fields: I) -> Result<Vec<u8>, String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(fields).map_err(|e| e.to_string())?;
    wtr.into_inner().map_err(|e| e.to_string())
}

fn append_locked(path: &Path, bytes: &[u8], create_new: bool) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.append(true);
    if create_new {
        options.create_new(true);
    }
    let mut file = options.open(path)?;
    file.lock()?;
    file.write_all(bytes)?;
    file.flush()?;
    file.unlock()
}
