use clap::{Parser, ValueEnum};
use std::env;

use crm_batch_export::api::customexport::{self, VersandtoolParams};
use crm_batch_export::config::ProcessConfig;
use crm_batch_export::domains::export::RangeMode;

#[derive(Parser, Debug)]
#[command(
    name = "versandtool_export",
    about = "Export mailable CRM contacts to the Versandtool CSV and upload it",
    long_about = "
Exports mailable CRM contacts chunk by chunk into the Versandtool CSV file and
hands the finished file to the configured transfer destination.

Database, local directory, site key and defaults come from the environment
(a .env file is read when present). Flags override them for this run.

Examples:
  versandtool_export --migrate
  versandtool_export --chunk-size 500 --target versandtool
  versandtool_export --range-mode chunk-ids
",
    version
)]
struct Args {
    /// Apply the bundled migrations before exporting
    #[arg(long)]
    migrate: bool,

    /// Contacts per chunk (overrides EXPORT_CHUNK_SIZE)
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Named export target from the versandtool_exports setting
    #[arg(long)]
    target: Option<String>,

    /// Contact-id range used for the relation joins (overrides EXPORT_RANGE_MODE)
    #[arg(long, value_enum)]
    range_mode: Option<RangeModeArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RangeModeArg {
    #[value(alias = "legacy_offset")]
    LegacyOffset,
    #[value(alias = "chunk_ids")]
    ChunkIds,
}

impl From<RangeModeArg> for RangeMode {
    fn from(arg: RangeModeArg) -> Self {
        match arg {
            RangeModeArg::LegacyOffset => RangeMode::LegacyOffset,
            RangeModeArg::ChunkIds => RangeMode::ChunkIds,
        }
    }
}

impl Args {
    fn params(&self) -> VersandtoolParams {
        VersandtoolParams {
            chunk_size: self.chunk_size,
            target: self.target.clone(),
            range_mode: self.range_mode.map(RangeMode::from),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    dotenv::dotenv().ok();
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let process = ProcessConfig::from_env()?;
    crm_batch_export::initialize(&process.database_url, args.migrate).await?;

    let response = customexport::versandtool(args.params()).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.is_error {
        std::process::exit(1);
    }
    Ok(())
}
