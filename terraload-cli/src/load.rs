//! Load command implementation for the Terraload CLI.

use std::{io, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use clap::{ArgAction, Parser};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use terraload_core::{LayerSet, LoadMode};
use terraload_data::{
    LoadConfig, LoadSummary, PbfRecordSource, SqliteDocumentSink, load_entities,
    load::{DEFAULT_BLOCK_SIZE, DEFAULT_CONCURRENCY},
};

use crate::{
    ARG_BLOCK_SIZE, ARG_CONCURRENCY, ARG_CREATE_INDEXES, ARG_DATABASE, ARG_LAYERS, ARG_MODE,
    ARG_OSM_PBF, ARG_QUEUE_CAPACITY, CliError, ENV_DATABASE, ENV_OSM_PBF,
};

/// CLI arguments for the `load` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Stream an OSM PBF extract into a SQLite document store. \
                 `initial` mode inserts into an empty store; `incremental` \
                 mode upserts by (id, kind) and can be re-applied. Options \
                 can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Load an OSM PBF file into the document store"
)]
#[ortho_config(prefix = "TERRALOAD")]
pub(crate) struct LoadArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(long = ARG_OSM_PBF, value_name = "path")]
    #[serde(default)]
    pub(crate) osm_pbf: Option<Utf8PathBuf>,
    /// Path to the SQLite document store; created when missing.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// `initial` (insert) or `incremental` (upsert). Defaults to `initial`.
    #[arg(long = ARG_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<String>,
    /// Comma-separated layers to load: point, path, relation. Defaults to all.
    #[arg(long = ARG_LAYERS, value_name = "list")]
    #[serde(default)]
    pub(crate) layers: Option<String>,
    /// Operations per batch write.
    #[arg(long = ARG_BLOCK_SIZE, value_name = "count")]
    #[serde(default)]
    pub(crate) block_size: Option<usize>,
    /// Number of concurrent batch writers.
    #[arg(long = ARG_CONCURRENCY, value_name = "count")]
    #[serde(default)]
    pub(crate) concurrency: Option<usize>,
    /// Capacity of each writer's queue. Defaults to the block size.
    #[arg(long = ARG_QUEUE_CAPACITY, value_name = "count")]
    #[serde(default)]
    pub(crate) queue_capacity: Option<usize>,
    /// Create secondary indexes once the load completes.
    #[arg(long = ARG_CREATE_INDEXES, action = ArgAction::SetTrue)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) create_indexes: bool,
}

impl LoadArgs {
    pub(crate) fn into_config(self) -> Result<LoadCommandConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LoadCommandConfig::try_from(merged)
    }
}

/// Resolved `load` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadCommandConfig {
    /// PBF input.
    pub(crate) osm_pbf: Utf8PathBuf,
    /// SQLite document store.
    pub(crate) database: Utf8PathBuf,
    /// Pipeline tunables.
    pub(crate) load: LoadConfig,
    /// Provision secondary indexes after the load.
    pub(crate) create_indexes: bool,
}

impl LoadCommandConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.osm_pbf, ARG_OSM_PBF)
    }
}

impl TryFrom<LoadArgs> for LoadCommandConfig {
    type Error = CliError;

    fn try_from(args: LoadArgs) -> Result<Self, Self::Error> {
        let osm_pbf = args.osm_pbf.ok_or(CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_OSM_PBF,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_DATABASE,
        })?;
        let mode = args
            .mode
            .as_deref()
            .map(str::parse::<LoadMode>)
            .transpose()
            .map_err(|source| CliError::InvalidOption {
                field: ARG_MODE,
                source,
            })?
            .unwrap_or_default();
        let layers = args
            .layers
            .as_deref()
            .map(str::parse::<LayerSet>)
            .transpose()
            .map_err(|source| CliError::InvalidOption {
                field: ARG_LAYERS,
                source,
            })?
            .unwrap_or_else(LayerSet::all);

        let load = LoadConfig {
            mode,
            block_size: args.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
            concurrency: args.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            layers,
            queue_capacity: args.queue_capacity,
        };
        load.validate()?;

        Ok(Self {
            osm_pbf,
            database,
            load,
            create_indexes: args.create_indexes,
        })
    }
}

pub(crate) fn run_load(args: LoadArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let summary = execute(&config)?;
    let dispatch = summary.dispatch;
    info!(
        "Loaded {} into {}: {} points, {} paths, {} relations ({} outside layers, {} hidden)",
        config.osm_pbf,
        config.database,
        dispatch.points,
        dispatch.paths,
        dispatch.relations,
        dispatch.skipped_layer,
        dispatch.skipped_hidden
    );
    Ok(())
}

/// Run the pipeline for `config` on a fresh multi-threaded runtime.
pub(crate) fn execute(config: &LoadCommandConfig) -> Result<LoadSummary, CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let source =
        PbfRecordSource::open(config.osm_pbf.as_std_path()).map_err(CliError::OpenSource)?;
    let store = SqliteDocumentSink::open(&config.database).map_err(|source| {
        CliError::OpenStore {
            path: config.database.clone(),
            source,
        }
    })?;

    let summary = runtime.block_on(load_entities(
        source,
        Arc::new(store.clone()),
        &config.load,
    ))?;

    if config.create_indexes {
        info!("Creating secondary indexes in {}", config.database);
        store
            .provision_indexes()
            .map_err(|source| CliError::ProvisionIndexes {
                path: config.database.clone(),
                source,
            })?;
    }
    Ok(summary)
}

fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "path has no file name"))?;
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.metadata(name).map(|meta| meta.is_file())
}
