pub mod checksum;
pub mod csv_record;
pub mod joiners;
pub mod service;
pub mod types;
pub mod upload;
pub mod versandtool;
pub mod writer;

pub use checksum::{ChecksumGenerator, ContactChecksum};
pub use csv_record::CsvRecord;
pub use service::{BatchExporter, ExportVariant, RunContext};
pub use types::{ExportError, ExportOutcome, ExportResult, ExportStats, ExporterConfig, RangeMode};
pub use upload::{SchemeTransferClient, TransferClient};
pub use versandtool::{VersandtoolExport, VersandtoolRow};
