use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_DUPLICATES_REPORT};

pub const DEFAULT_INPUT: &str = "data_source/healthcare_dataset.csv";
pub const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean a healthcare CSV dataset and load it into MongoDB",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize and check the dataset without writing anything
    Analyze(AnalyzeArgs),
    /// Analyze the dataset, then replace the destination collection with it
    Import(ImportArgs),
    /// Run an insert/find/update/delete exercise against the destination
    Crud(ConnectionArgs),
    /// Check that the destination answers a ping
    Ping(ConnectionArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input CSV file holding the dataset
    #[arg(short = 'i', long = "input", default_value = DEFAULT_INPUT)]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// URL to download the dataset from when the input file is absent
    #[arg(long = "dataset-url")]
    pub dataset_url: Option<String>,
    /// Where rows taking part in exact duplicates are written for review
    #[arg(long = "duplicates-report", default_value = DEFAULT_DUPLICATES_REPORT)]
    pub duplicates_report: PathBuf,
    /// Skip writing the duplicate report
    #[arg(long = "no-duplicates-report", conflicts_with = "duplicates_report")]
    pub no_duplicates_report: bool,
    /// Fail the analysis when any value is missing
    #[arg(long = "strict-missing-values")]
    pub strict_missing_values: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Environment file holding the MONGO_* settings
    #[arg(long = "env-file", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,
    /// Database name (overrides MONGO_DB_NAME)
    #[arg(long)]
    pub database: Option<String>,
    /// Collection name (overrides MONGO_COLLECTION)
    #[arg(long)]
    pub collection: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Number of documents per insert batch
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Count rows that cannot be mapped as skipped instead of halting
    #[arg(long = "skip-failed-rows")]
    pub skip_failed_rows: bool,
    /// Load into an in-process collection instead of MongoDB
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Write the migration statistics as JSON to this file
    #[arg(long = "stats")]
    pub stats: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_aliases_resolve() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn import_defaults() {
        let cli = Cli::try_parse_from(["hospital-import", "import"]).unwrap();
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(args.connection.env_file, PathBuf::from(".env"));
        assert!(!args.dry_run);
        assert!(!args.skip_failed_rows);
    }

    #[test]
    fn report_flags_conflict() {
        let result = Cli::try_parse_from([
            "hospital-import",
            "analyze",
            "--duplicates-report",
            "dups.csv",
            "--no-duplicates-report",
        ]);
        assert!(result.is_err());
    }
}
