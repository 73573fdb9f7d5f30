//! Command-line interface for the Terraload bulk loader.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod error;
mod load;

pub use error::CliError;

use load::LoadArgs;

const ARG_OSM_PBF: &str = "osm-pbf";
const ARG_DATABASE: &str = "database";
const ARG_MODE: &str = "mode";
const ARG_LAYERS: &str = "layers";
const ARG_BLOCK_SIZE: &str = "block-size";
const ARG_CONCURRENCY: &str = "concurrency";
const ARG_QUEUE_CAPACITY: &str = "queue-capacity";
const ARG_CREATE_INDEXES: &str = "create-indexes";
const ENV_OSM_PBF: &str = "TERRALOAD_CMDS_LOAD_OSM_PBF";
const ENV_DATABASE: &str = "TERRALOAD_CMDS_LOAD_DATABASE";
const DEFAULT_LOG_FILTER: &str = "info";

/// Run the Terraload CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => return Err(CliError::ArgumentParsing(err)),
    };
    init_logging()?;
    match cli.command {
        Command::Load(args) => load::run_load(args),
    }
}

/// Route `log` records and spans to stderr, filtered by `RUST_LOG`.
fn init_logging() -> Result<(), CliError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(CliError::InitLogging)
}

#[derive(Debug, Parser)]
#[command(
    name = "terraload",
    about = "Bulk-load OpenStreetMap extracts into a document store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stream an OSM PBF file into the document store.
    Load(LoadArgs),
}

#[cfg(test)]
mod tests;
