//! Error types emitted by the Terraload CLI.
//!
//! Messages name the failing step only; `main` prints the `source` chain
//! underneath.

use std::sync::Arc;

use camino::Utf8PathBuf;
use terraload_core::ParseOptionError;
use terraload_data::{LoadConfigError, LoadError, SourceError, SqliteSinkError};
use thiserror::Error;

/// Errors emitted by the Terraload CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A mode or layer option could not be parsed.
    #[error("invalid value for --{field}")]
    InvalidOption {
        field: &'static str,
        #[source]
        source: ParseOptionError,
    },
    /// The merged tunables cannot drive a load.
    #[error("invalid load settings")]
    InvalidLoadConfig(#[from] LoadConfigError),
    /// A referenced input path does not exist.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Installing the log subscriber failed.
    #[error("failed to initialise logging")]
    InitLogging(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Building the async runtime failed.
    #[error("failed to start the async runtime")]
    Runtime(#[source] std::io::Error),
    /// Opening the PBF input failed.
    #[error("failed to open OSM PBF input")]
    OpenSource(#[source] SourceError),
    /// Opening the document store failed.
    #[error("failed to open document store at {path:?}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: SqliteSinkError,
    },
    /// The load pipeline failed.
    #[error("load failed")]
    Load(#[from] LoadError),
    /// Creating secondary indexes failed.
    #[error("failed to create indexes in {path:?}")]
    ProvisionIndexes {
        path: Utf8PathBuf,
        #[source]
        source: SqliteSinkError,
    },
}
