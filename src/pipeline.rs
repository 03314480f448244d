//! Analysis stage: normalize, check, and clean the raw table.
//!
//! Missing expected columns and heterogeneous columns stop the run before any
//! write. Missing values are reported only (unless the strict option is set).
//! Duplicates are removed in place and the run continues.

use itertools::Itertools;
use log::{error, info, warn};
use thiserror::Error;

use crate::{
    checks,
    config::{INCONSISTENT_PREVIEW_ROWS, PipelineConfig, UNIQUE_VALUES_DISPLAY_LIMIT},
    data::{RawTable, Table},
    dedup, normalize,
};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("expected column(s) missing: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },
    #[error("column(s) mixing value types: {}", columns.join(", "))]
    HeterogeneousColumns { columns: Vec<String> },
    #[error("{total} missing value(s) found")]
    MissingValues { total: usize },
    #[error("writing the duplicate report failed: {0:#}")]
    DuplicateReport(anyhow::Error),
}

/// Counts gathered while cleaning, reported alongside the cleaned table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub input_rows: usize,
    pub exact_duplicates: usize,
    pub inconsistent_columns: Vec<String>,
    pub logical_duplicates: usize,
    pub missing_values: usize,
    pub extra_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub table: Table,
    pub summary: AnalysisSummary,
}

pub fn analyze(raw: &RawTable, config: &PipelineConfig) -> Result<Analysis, AnalysisError> {
    let table = normalize::normalize_table(raw);
    info!("[OK] Table normalized ({} row(s))", table.len());

    let diff = checks::check_expected_columns(&table, &config.expected_columns);
    if !diff.missing.is_empty() {
        error!("[ERROR] Inspect the input file or adapt the expected columns");
        return Err(AnalysisError::MissingColumns {
            columns: diff.missing.into_iter().collect(),
        });
    }

    if checks::check_column_value_types(&table) {
        error!("[ERROR] Type errors detected in some columns");
        let columns = table
            .profiles()
            .iter()
            .filter(|profile| profile.kinds.len() > 1)
            .map(|profile| profile.name.clone())
            .collect();
        return Err(AnalysisError::HeterogeneousColumns { columns });
    }
    info!("[OK] Every column holds a single value type");

    info!("Checking missing values per column");
    let missing_values = checks::missing_value_counts(&table)
        .iter()
        .map(|(_, n)| n)
        .sum::<usize>();
    if checks::check_missing_values(&table) && config.strict_missing_values {
        return Err(AnalysisError::MissingValues {
            total: missing_values,
        });
    }

    let input_rows = table.len();
    let exact_duplicates = dedup::count_exact_duplicates(&table);
    let mut cleaned = dedup::drop_duplicates(&table, config.duplicates_report.as_deref())
        .map_err(AnalysisError::DuplicateReport)?;

    let inconsistent_columns = dedup::find_inconsistent_columns(&cleaned);
    let mut logical_duplicates = 0;
    if inconsistent_columns.is_empty() {
        info!("[OK] No inconsistent column");
    } else {
        warn!(
            "[WARN] Inconsistent column(s): {}",
            inconsistent_columns.iter().join(", ")
        );
        dedup::log_inconsistent_preview(&cleaned, &inconsistent_columns, INCONSISTENT_PREVIEW_ROWS);
        let deduplicated = dedup::drop_inconsistent_duplicates(&cleaned, &inconsistent_columns);
        info!("  Before logical deduplication: {} row(s)", cleaned.len());
        info!("  After logical deduplication: {} row(s)", deduplicated.len());
        logical_duplicates = cleaned.len() - deduplicated.len();
        cleaned = deduplicated;
    }

    let unique_columns = config
        .unique_value_columns
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>();
    checks::show_unique_values(&cleaned, &unique_columns, UNIQUE_VALUES_DISPLAY_LIMIT);

    info!("[OK] Analysis finished: {} row(s) ready", cleaned.len());
    Ok(Analysis {
        table: cleaned,
        summary: AnalysisSummary {
            input_rows,
            exact_duplicates,
            inconsistent_columns,
            logical_duplicates,
            missing_values,
            extra_columns: diff.extra.into_iter().collect(),
        },
    })
}
