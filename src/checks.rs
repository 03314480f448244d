//! Read-only consistency checks over a normalized [`Table`].
//!
//! Each check logs its findings and returns a pass/fail signal; the analysis
//! stage in [`crate::pipeline`] decides which signals are fatal.

use std::collections::{BTreeSet, HashSet};

use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    data::{Table, display_cell},
    table,
};

/// Column set difference between a table and the expected schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSetDiff {
    pub missing: BTreeSet<String>,
    pub extra: BTreeSet<String>,
}

impl ColumnSetDiff {
    pub fn is_conforming(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

pub fn check_expected_columns(table: &Table, expected: &[String]) -> ColumnSetDiff {
    let current = table.headers().iter().cloned().collect::<BTreeSet<_>>();
    let expected = expected.iter().cloned().collect::<BTreeSet<_>>();
    let diff = ColumnSetDiff {
        missing: expected.difference(&current).cloned().collect(),
        extra: current.difference(&expected).cloned().collect(),
    };

    if diff.is_conforming() {
        info!("[OK] Column schema conforms");
        return diff;
    }
    if diff.missing.is_empty() {
        info!("[OK] No missing column");
    } else {
        warn!("[WARN] Missing column(s): {}", diff.missing.iter().join(", "));
    }
    if diff.extra.is_empty() {
        info!("[OK] No extra column");
    } else {
        info!("[INFO] Extra column(s): {}", diff.extra.iter().join(", "));
    }
    diff
}

/// Returns `true` when at least one column mixes value kinds.
pub fn check_column_value_types(table: &Table) -> bool {
    let mut has_errors = false;
    for profile in table.profiles() {
        let name = profile.name.chars().take(40).collect::<String>();
        // all-null columns carry no kind and pass
        if profile.kinds.len() <= 1 {
            info!("  [OK] Column: {name:<40} {}", profile.summary());
        } else {
            warn!("  [ERROR] Column: {name:<40} {}", profile.summary());
            has_errors = true;
        }
    }
    has_errors
}

/// Null count per column, in table order.
pub fn missing_value_counts(table: &Table) -> Vec<(String, usize)> {
    table
        .profiles()
        .iter()
        .map(|profile| (profile.name.clone(), profile.nulls))
        .collect()
}

/// Returns `true` when any cell in the table is null.
pub fn check_missing_values(table: &Table) -> bool {
    let counts = missing_value_counts(table);
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        info!(
            "[OK] No missing value detected. {} row(s), {} column(s)",
            table.len(),
            table.column_count()
        );
        return false;
    }

    warn!("[WARN] {total} missing value(s) in total");
    let rows = counts
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(column, n)| {
            let percent = if table.is_empty() {
                0.0
            } else {
                n as f64 / table.len() as f64 * 100.0
            };
            vec![column, n.to_string(), format!("{percent:.1} %")]
        })
        .collect::<Vec<_>>();
    table::log_table(
        &[
            "column".to_string(),
            "missing".to_string(),
            "share".to_string(),
        ],
        &rows,
    );
    true
}

/// Distinct trimmed values of a column, sorted.
pub fn unique_values(table: &Table, column: &str) -> Option<Vec<String>> {
    let idx = table.column_index(column)?;
    let values = table
        .rows()
        .iter()
        .filter_map(|row| row[idx].as_ref())
        .map(|value| value.as_display().trim().to_string())
        .collect::<HashSet<_>>();
    Some(values.into_iter().sorted().collect())
}

/// Logs the distinct values of each column, listing them when fewer than
/// `max_values`.
pub fn show_unique_values(table: &Table, columns: &[&str], max_values: usize) {
    info!("Distinct values per column:");
    for column in columns {
        let Some(values) = unique_values(table, column) else {
            warn!("  '{column}' is not present in the table");
            continue;
        };
        info!("  '{column}' holds {} distinct value(s)", values.len());
        if values.len() < max_values {
            info!("     {}", values.join(", "));
        } else {
            info!("     too many distinct values to list");
        }
    }
}

/// First `limit` rows rendered as display strings.
pub fn preview_rows(table: &Table, limit: usize) -> Vec<Vec<String>> {
    table
        .rows()
        .iter()
        .take(limit)
        .map(|row| row.iter().map(display_cell).collect())
        .collect()
}
