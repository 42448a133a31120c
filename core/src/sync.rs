//! Change-buffer synchronization
//!
//! A buffer table holds pending edits against a `current` table that may be
//! refreshed from outside at any time. [`ChangeBufferSynchronizer`] folds the
//! buffer into `current` without losing edits that `current` does not reflect
//! yet, then reloads the buffer from the result so both hold the same rows.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::config::{DuplicateKeyPolicy, MergeOptions};
use crate::error::{Result, TablesyncError};
use crate::key::{CompoundKey, KeyCodec};
use crate::merge::{DuplicateKey, KeyIndex};
use crate::schema::Side;
use crate::table::{Row, RowId, RowState, RowStateKind, Table};

/// What one synchronization did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub table: String,
    /// Buffer rows whose key was found in `current`
    pub pending: usize,
    /// Deleted buffer rows with no counterpart, dropped
    pub finalized: usize,
    /// Buffer rows re-added to `current` as new rows
    pub reapplied: usize,
    /// `current` rows marked deleted for lack of a buffer counterpart
    pub deleted: usize,
    /// Buffer rows written over (or appended to) `current`
    pub absorbed: usize,
    /// Columns created in `current` to hold buffer values
    pub columns_added: usize,
    /// Keys held by more than one live row; `Left` is the buffer side
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_keys: Vec<DuplicateKey>,
}

impl SyncReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }
}

/// Reconciles a pending-edits buffer with a refreshed table
#[derive(Debug, Clone, Default)]
pub struct ChangeBufferSynchronizer {
    options: MergeOptions,
}

impl ChangeBufferSynchronizer {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Fold `buffer` into `current` and reload `buffer` from the result.
    ///
    /// Both tables must declare a primary key and every buffer key column
    /// must exist in `current`; nothing is mutated otherwise.
    pub fn synchronize(&self, buffer: &mut Table, current: &mut Table) -> Result<SyncReport> {
        for table in [&*buffer, &*current] {
            if !table.has_primary_key() {
                return Err(TablesyncError::MissingPrimaryKey {
                    table: table.name().to_string(),
                });
            }
        }

        let buffer_codec = KeyCodec::for_table(buffer);
        let mut report = SyncReport::new(current.name());
        // Matches buffer keys against current by the buffer's key column names
        let mut current_codec = KeyCodec::with_columns(current, buffer.primary_key())?;

        report.duplicate_keys = KeyIndex::build(buffer, &buffer_codec).duplicates(Side::Left);
        report
            .duplicate_keys
            .extend(KeyIndex::build(current, &current_codec).duplicates(Side::Right));
        if !report.duplicate_keys.is_empty() {
            if self.options.duplicate_keys == DuplicateKeyPolicy::Reject {
                return Err(TablesyncError::DuplicateKeys {
                    table: current.name().to_string(),
                    keys: report
                        .duplicate_keys
                        .iter()
                        .map(|d| d.key.join("|"))
                        .collect(),
                });
            }
            for duplicate in &report.duplicate_keys {
                log::warn!(
                    "Table '{}': key {:?} held by {} rows on the {} side",
                    current.name(),
                    duplicate.key,
                    duplicate.rows.len(),
                    if duplicate.side == Side::Left { "buffer" } else { "current" }
                );
            }
        }

        log::debug!(
            "Synchronizing buffer '{}' ({} rows) into '{}' ({} rows)",
            buffer.name(),
            buffer.row_count(),
            current.name(),
            current.row_count()
        );

        // Pending rows stay; the rest are finalized or re-applied to current
        let current_keys: HashSet<CompoundKey> = current
            .rows()
            .iter()
            .map(|row| current_codec.encode(row))
            .collect();
        let mut settled: HashSet<RowId> = HashSet::new();
        for row in buffer.rows() {
            if current_keys.contains(&buffer_codec.encode(row)) {
                report.pending += 1;
                continue;
            }
            settled.insert(row.id());
            if row.is_deleted() {
                report.finalized += 1;
                continue;
            }
            if !same_columns(buffer, current) {
                report.columns_added += current.add_missing_columns(buffer);
                current_codec = KeyCodec::with_columns(current, buffer.primary_key())?;
            }
            let values = current.project_values(buffer, row.values());
            current.push_row(values, RowState::Added);
            report.reapplied += 1;
        }
        buffer.remove_rows(&settled);

        // Rows the buffer no longer vouches for are deleted in current
        let vouched: HashSet<CompoundKey> = buffer
            .rows()
            .iter()
            .filter(|row| !row.is_deleted())
            .map(|row| buffer_codec.encode(row))
            .collect();
        let orphaned: Vec<RowId> = current
            .rows()
            .iter()
            .filter(|row| {
                matches!(row.kind(), RowStateKind::Unchanged | RowStateKind::Modified)
                    && !vouched.contains(&current_codec.encode(row))
            })
            .map(Row::id)
            .collect();
        for id in orphaned {
            current.delete_row(id)?;
            report.deleted += 1;
        }

        report.columns_added += current.add_missing_columns(buffer);
        let current_codec = KeyCodec::with_columns(current, buffer.primary_key())?;
        report.absorbed = absorb(buffer, &buffer_codec, current, &current_codec)?;

        buffer.reload_from(current);

        log::info!(
            "Synchronized '{}': {} pending, {} reapplied, {} finalized, {} deleted",
            report.table,
            report.pending,
            report.reapplied,
            report.finalized,
            report.deleted
        );
        Ok(report)
    }
}

fn same_columns(a: &Table, b: &Table) -> bool {
    a.columns().all(|column| b.has_column(&column.name))
}

/// Write every buffer row over the `current` row holding the same key, or
/// append it when there is none. Returns the number of rows written.
fn absorb(
    buffer: &Table,
    buffer_codec: &KeyCodec,
    current: &mut Table,
    current_codec: &KeyCodec,
) -> Result<usize> {
    // Unclaimed current rows per key, in row order, with their liveness
    let mut candidates: HashMap<CompoundKey, Vec<(RowId, bool)>> = HashMap::new();
    for row in current.rows() {
        candidates
            .entry(current_codec.encode(row))
            .or_default()
            .push((row.id(), row.is_live()));
    }

    let mut absorbed = 0;
    for row in buffer.rows() {
        let target = candidates
            .get_mut(&buffer_codec.encode(row))
            .filter(|rows| !rows.is_empty())
            .map(|rows| {
                let pick = rows
                    .iter()
                    .position(|&(_, live)| live == row.is_live())
                    .unwrap_or(0);
                rows.remove(pick).0
            });

        let values = current.project_values(buffer, row.values());
        let state = project_state(current, buffer, row.state());
        match target {
            Some(id) => current.replace_row(id, values, state)?,
            None => {
                current.push_row(values, state);
            }
        }
        absorbed += 1;
    }

    Ok(absorbed)
}

fn project_state(target: &Table, source: &Table, state: &RowState) -> RowState {
    match state {
        RowState::Modified { baseline } => RowState::Modified {
            baseline: target.project_values(source, baseline),
        },
        RowState::Deleted { original } => RowState::Deleted {
            original: target.project_values(source, original),
        },
        other => other.clone(),
    }
}
