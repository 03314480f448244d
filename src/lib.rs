pub mod checks;
pub mod cli;
pub mod columns;
pub mod config;
pub mod crud;
pub mod data;
pub mod dedup;
pub mod document;
pub mod io_utils;
pub mod migrate;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod source;
pub mod store;
pub mod table;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, error, info};

use crate::{
    cli::{AnalyzeArgs, Cli, Commands, ConnectionArgs, ImportArgs, SourceArgs},
    config::{MongoSettings, PipelineConfig, RowFailurePolicy},
    migrate::MigrationStats,
    pipeline::Analysis,
    store::{DocumentStore, MemoryStore, MongoStore},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("hospital_import", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    info!("hospital-import {}", env!("CARGO_PKG_VERSION"));
    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Import(args) => handle_import(&args),
        Commands::Crud(args) => handle_crud(&args),
        Commands::Ping(args) => handle_ping(&args),
    }
}

fn pipeline_config(source: &SourceArgs) -> PipelineConfig {
    PipelineConfig {
        duplicates_report: (!source.no_duplicates_report)
            .then(|| source.duplicates_report.clone()),
        strict_missing_values: source.strict_missing_values,
        ..PipelineConfig::default()
    }
}

fn load_and_analyze(source: &SourceArgs, config: &PipelineConfig) -> Result<Analysis> {
    source::ensure_dataset(&source.input, source.dataset_url.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&source.input, source.delimiter);
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}'",
        source.input.display(),
        printable_delimiter(delimiter)
    );
    let raw = source::load_raw_table(&source.input, delimiter, encoding)
        .with_context(|| format!("Loading dataset from {:?}", source.input))?;
    if raw.is_empty() {
        bail!("{:?} holds no rows; nothing to analyze", source.input);
    }
    let analysis = pipeline::analyze(&raw, config)?;
    debug!("Analysis summary: {:?}", analysis.summary);
    Ok(analysis)
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    let config = pipeline_config(&args.source);
    let analysis = load_and_analyze(&args.source, &config)?;
    let summary = &analysis.summary;
    info!(
        "[OK] {} input row(s), {} exact duplicate(s), {} logical duplicate(s), {} row(s) kept",
        summary.input_rows,
        summary.exact_duplicates,
        summary.logical_duplicates,
        analysis.table.len()
    );
    Ok(())
}

fn mongo_settings(args: &ConnectionArgs) -> Result<MongoSettings> {
    config::load_env_file(&args.env_file)?;
    let mut settings = MongoSettings::from_env()?;
    if let Some(database) = &args.database {
        settings.database = database.clone();
    }
    if let Some(collection) = &args.collection {
        settings.collection = collection.clone();
    }
    Ok(settings)
}

fn connect(args: &ConnectionArgs) -> Result<MongoStore> {
    let settings = mongo_settings(args)?;
    info!("Connecting to {}", settings.redacted_connection_string());
    let store = MongoStore::connect(&settings)
        .with_context(|| format!("Connecting to {}", settings.redacted_connection_string()))?;
    store
        .ping()
        .with_context(|| format!("Pinging {}", store.namespace()))?;
    info!("[OK] {} is reachable", store.namespace());
    Ok(store)
}

fn handle_ping(args: &ConnectionArgs) -> Result<()> {
    connect(args).map(|_| ())
}

fn handle_crud(args: &ConnectionArgs) -> Result<()> {
    let store = connect(args)?;
    let report = crud::run_crud(&store)?;
    debug!("CRUD report: {report:?}");
    Ok(())
}

fn handle_import(args: &ImportArgs) -> Result<()> {
    let mut config = pipeline_config(&args.source).with_batch_size(args.batch_size)?;
    if args.skip_failed_rows {
        config.row_failure_policy = RowFailurePolicy::Skip;
    }

    let store: Box<dyn DocumentStore> = if args.dry_run {
        let database = args
            .connection
            .database
            .as_deref()
            .unwrap_or(config::DEFAULT_DATABASE);
        let collection = args
            .connection
            .collection
            .as_deref()
            .unwrap_or(config::DEFAULT_COLLECTION);
        info!("Dry run: loading into an in-process collection");
        Box::new(MemoryStore::new(database, collection))
    } else {
        Box::new(connect(&args.connection)?)
    };

    let analysis = load_and_analyze(&args.source, &config)?;
    let stats = migrate::run_migration(&analysis.table, store.as_ref(), &config)?;
    if let Some(path) = &args.stats {
        write_stats(path, &stats)?;
    }
    info!(
        "Migration: {} row(s), {} inserted in {} batch(es), {} skipped",
        stats.total_rows, stats.total_inserted, stats.batches, stats.skipped_rows
    );
    if stats.had_error {
        error!("[ERROR] Migration into {} failed", store.namespace());
        bail!("migration into {} finished with errors", store.namespace());
    }
    info!("[OK] Migration into {} finished", store.namespace());
    Ok(())
}

fn write_stats(path: &Path, stats: &MigrationStats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("Serializing migration stats")?;
    fs::write(path, json).with_context(|| format!("Writing migration stats to {path:?}"))?;
    info!("Migration stats written to {path:?}");
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
