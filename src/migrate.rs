//! Full-replace batched load of a cleaned table into the destination.
//!
//! The protocol is strictly ordered: clear, create with validator, index,
//! insert in batches, reconcile the stored count. A failing setup step stops
//! the run before any data is written; a failing batch stops the remaining
//! batches and leaves earlier ones in place.

use log::{error, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::{PipelineConfig, RowFailurePolicy},
    data::Table,
    document::row_to_document,
    schema,
    store::{DocumentStore, StoreError},
};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not clear collection {namespace}")]
    Drop { namespace: String },
    #[error("could not create collection {namespace}: {source}")]
    Create {
        namespace: String,
        #[source]
        source: StoreError,
    },
    #[error("could not create the indexes of {namespace}")]
    Index { namespace: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    pub total_rows: usize,
    pub total_inserted: usize,
    /// Documents counted in the destination after the last batch, when the
    /// count itself succeeded.
    pub stored_count: Option<u64>,
    pub skipped_rows: usize,
    pub batches: usize,
    pub batch_sizes: Vec<usize>,
    pub had_error: bool,
}

/// Clears the collection when it holds documents. Returns the prior count,
/// `0` when it was already empty and `-1` when clearing failed.
pub fn drop_collection(store: &dyn DocumentStore) -> i64 {
    let cleared = store.count_documents().and_then(|count| {
        if count > 0 {
            store.drop_collection()?;
        }
        Ok(count)
    });
    match cleared {
        Ok(count) => i64::try_from(count).unwrap_or(i64::MAX),
        Err(err) => {
            warn!("[WARN] Clearing {} failed: {err}", store.namespace());
            -1
        }
    }
}

pub fn create_collection(store: &dyn DocumentStore) -> Result<(), StoreError> {
    store.create_collection(&schema::hospitalization_validator())
}

/// Creates every secondary index; stops at the first failure.
pub fn create_indexes(store: &dyn DocumentStore) -> bool {
    for spec in &schema::INDEXES {
        if let Err(err) = store.create_index(spec) {
            error!("[ERROR] Creating index {} failed: {err}", spec.name);
            return false;
        }
    }
    true
}

fn flush_batch(
    store: &dyn DocumentStore,
    batch: &mut Vec<mongodb::bson::Document>,
    stats: &mut MigrationStats,
) -> Result<(), StoreError> {
    stats.batches += 1;
    stats.batch_sizes.push(batch.len());
    let inserted = store.insert_many(batch)?;
    stats.total_inserted += inserted;
    info!("  [INFO] Batch {}: {inserted} document(s) inserted", stats.batches);
    batch.clear();
    Ok(())
}

/// Maps and inserts every row of `table` in batches of `config.batch_size`,
/// then reconciles the stored document count.
pub fn migrate_table(
    table: &Table,
    store: &dyn DocumentStore,
    config: &PipelineConfig,
) -> MigrationStats {
    let batch_size = config.batch_size.max(1);
    let total_rows = table.len();
    let mut stats = MigrationStats {
        total_rows,
        ..MigrationStats::default()
    };
    let mut batch = Vec::with_capacity(batch_size.min(total_rows));

    for (idx, row) in table.rows().iter().enumerate() {
        let position = idx + 1;
        match row_to_document(table.headers(), row) {
            Ok(document) => batch.push(document),
            Err(reason) => {
                stats.skipped_rows += 1;
                warn!("[WARN] Row {position} could not be mapped: {reason}");
                if config.row_failure_policy == RowFailurePolicy::Abort {
                    error!("[ERROR] Migration halted at row {position}");
                    stats.had_error = true;
                    break;
                }
            }
        }

        let is_batch_full = position % batch_size == 0;
        let is_last_row = position == total_rows;
        if (is_batch_full || is_last_row) && !batch.is_empty() {
            if let Err(err) = flush_batch(store, &mut batch, &mut stats) {
                error!("[ERROR] Batch {} failed: {err}", stats.batches);
                stats.had_error = true;
                break;
            }
        }
    }

    match store.count_documents() {
        Ok(count) => {
            stats.stored_count = Some(count);
            let expected = (total_rows - stats.skipped_rows) as u64;
            if count != expected {
                error!(
                    "[ERROR] {count} document(s) stored but {expected} were expected in {}",
                    store.namespace()
                );
                stats.had_error = true;
            } else if !stats.had_error {
                info!("[INFO] All {count} cleaned row(s) were imported");
            }
        }
        Err(err) => {
            error!("[ERROR] Counting documents in {} failed: {err}", store.namespace());
            stats.had_error = true;
        }
    }
    if stats.skipped_rows > 0 {
        info!("[INFO] Skipped rows: {}", stats.skipped_rows);
    }
    stats
}

/// Runs the whole load protocol against `store`.
pub fn run_migration(
    table: &Table,
    store: &dyn DocumentStore,
    config: &PipelineConfig,
) -> Result<MigrationStats, MigrationError> {
    let namespace = store.namespace();
    let previous = drop_collection(store);
    if previous < 0 {
        return Err(MigrationError::Drop { namespace });
    }
    info!("[INFO] {namespace}: {previous} previous document(s) removed");

    create_collection(store).map_err(|source| MigrationError::Create {
        namespace: namespace.clone(),
        source,
    })?;
    info!("[OK] Collection {namespace} bound to its validator");

    if !create_indexes(store) {
        return Err(MigrationError::Index { namespace });
    }
    info!("[OK] {} index(es) created", schema::INDEXES.len());

    Ok(migrate_table(table, store, config))
}
