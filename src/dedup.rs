//! Exact and logical duplicate handling.
//!
//! Exact duplicates are rows equal on every column; two nulls compare equal.
//! A column is *inconsistent* when some group of rows sharing every other
//! column's value holds more than one distinct value for it. Rows that agree
//! on all consistent columns are logical duplicates and collapse to their
//! first occurrence.

use std::{
    collections::{HashMap, hash_map::Entry},
    path::Path,
};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    data::{Table, Value, compare_cells, display_cell},
    io_utils, table,
};

/// Which occurrences of a duplicate group are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    /// Mark every occurrence after the first.
    First,
    /// Mark every member of a group with more than one row.
    None,
}

/// Marks rows that duplicate another row on `key_columns`.
pub fn duplicated(table: &Table, key_columns: &[usize], keep: Keep) -> Vec<bool> {
    let mut first_seen: HashMap<Vec<&Option<Value>>, usize> = HashMap::new();
    let mut mask = vec![false; table.len()];
    for (idx, row) in table.rows().iter().enumerate() {
        let key = key_columns.iter().map(|&c| &row[c]).collect::<Vec<_>>();
        match first_seen.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(idx);
            }
            Entry::Occupied(slot) => {
                mask[idx] = true;
                if keep == Keep::None {
                    mask[*slot.get()] = true;
                }
            }
        }
    }
    mask
}

fn all_columns(table: &Table) -> Vec<usize> {
    (0..table.column_count()).collect()
}

fn unmarked_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, marked)| !**marked)
        .map(|(idx, _)| idx)
        .collect()
}

fn marked_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, marked)| **marked)
        .map(|(idx, _)| idx)
        .collect()
}

/// Number of rows that repeat an earlier row exactly.
pub fn count_exact_duplicates(table: &Table) -> usize {
    duplicated(table, &all_columns(table), Keep::First)
        .into_iter()
        .filter(|d| *d)
        .count()
}

/// Every row taking part in an exact duplicate (originals and copies),
/// stably sorted by the first column with nulls last.
pub fn exact_duplicate_rows(table: &Table) -> Table {
    let mask = duplicated(table, &all_columns(table), Keep::None);
    let mut indices = marked_indices(&mask);
    if table.column_count() > 0 {
        indices.sort_by(|&a, &b| compare_cells(&table.rows()[a][0], &table.rows()[b][0]));
    }
    table.select_rows(&indices)
}

/// Writes the rows involved in exact duplicates to `path` for manual review.
/// Returns the number of rows written (nothing is written when zero).
pub fn save_duplicated(table: &Table, path: &Path) -> Result<usize> {
    let duplicates = exact_duplicate_rows(table);
    if duplicates.is_empty() {
        info!("[INFO] No duplicate row to save");
        return Ok(0);
    }
    info!(
        "[INFO] {} row(s) take part in at least one duplicate",
        duplicates.len()
    );

    let delimiter = io_utils::resolve_input_delimiter(path, None);
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    writer
        .write_record(duplicates.headers())
        .context("Writing duplicate report headers")?;
    for (idx, row) in duplicates.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(display_cell))
            .with_context(|| format!("Writing duplicate report row {}", idx + 2))?;
    }
    writer.flush().context("Flushing duplicate report")?;
    info!(
        "[INFO] Duplicate rows written to '{}' (sorted by '{}'): {} row(s)",
        path.display(),
        duplicates.headers()[0],
        duplicates.len()
    );
    Ok(duplicates.len())
}

/// Collapses exact duplicates keeping the first occurrence. When duplicates
/// exist and `report` is set, the duplicate rows are saved there first.
pub fn drop_duplicates(table: &Table, report: Option<&Path>) -> Result<Table> {
    let mask = duplicated(table, &all_columns(table), Keep::First);
    let dup_count = mask.iter().filter(|d| **d).count();
    if dup_count == 0 {
        info!("[INFO] No duplicate row detected");
        return Ok(table.clone());
    }

    warn!("[WARN] {dup_count} strictly identical row(s) detected");
    if let Some(path) = report {
        save_duplicated(table, path)
            .with_context(|| format!("Saving duplicate rows to {path:?}"))?;
    }
    let cleaned = table.select_rows(&unmarked_indices(&mask));
    info!(
        "[INFO] {} row(s) before, {} row(s) after",
        table.len(),
        cleaned.len()
    );
    Ok(cleaned)
}

/// Columns whose value is not determined by the values of all other columns.
///
/// Groups whose key holds a null are ignored, as are null values of the
/// candidate column.
pub fn find_inconsistent_columns(table: &Table) -> Vec<String> {
    let width = table.column_count();
    let mut inconsistent = Vec::new();
    for column in 0..width {
        let others = (0..width).filter(|&c| c != column).collect::<Vec<_>>();
        let mut seen: HashMap<Vec<&Value>, &Value> = HashMap::new();
        let conflicting = table.rows().iter().any(|row| {
            let Some(value) = row[column].as_ref() else {
                return false;
            };
            let Some(key) = others
                .iter()
                .map(|&c| row[c].as_ref())
                .collect::<Option<Vec<_>>>()
            else {
                return false;
            };
            match seen.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                    false
                }
                Entry::Occupied(slot) => *slot.get() != value,
            }
        });
        if conflicting {
            inconsistent.push(table.headers()[column].clone());
        }
    }
    inconsistent
}

fn key_columns(table: &Table, inconsistent: &[String]) -> Vec<usize> {
    table
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, name)| !inconsistent.contains(name))
        .map(|(idx, _)| idx)
        .collect()
}

/// Rows that collide on the consistent columns, sorted by those columns.
pub fn inconsistent_rows(table: &Table, inconsistent: &[String]) -> Table {
    let keys = key_columns(table, inconsistent);
    let mask = duplicated(table, &keys, Keep::None);
    let mut indices = marked_indices(&mask);
    indices.sort_by(|&a, &b| {
        let (left, right) = (&table.rows()[a], &table.rows()[b]);
        keys.iter()
            .map(|&c| compare_cells(&left[c], &right[c]))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    table.select_rows(&indices)
}

/// Drops logical duplicates: rows equal on every column except the
/// inconsistent ones, keeping the first occurrence of each key.
pub fn drop_inconsistent_duplicates(table: &Table, inconsistent: &[String]) -> Table {
    if inconsistent.is_empty() {
        return table.clone();
    }
    let keys = key_columns(table, inconsistent);
    let mask = duplicated(table, &keys, Keep::First);
    table.select_rows(&unmarked_indices(&mask))
}

/// Logs the first `limit` colliding rows for the given inconsistent columns.
pub fn log_inconsistent_preview(table: &Table, inconsistent: &[String], limit: usize) {
    let colliding = inconsistent_rows(table, inconsistent);
    let rows = crate::checks::preview_rows(&colliding, limit);
    table::log_table(colliding.headers(), &rows);
}
