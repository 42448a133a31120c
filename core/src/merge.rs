//! Whole-table snapshot reconciliation
//!
//! [`SnapshotMerger`] takes an `original` and a `changed` snapshot of the same
//! table and produces a third table in which every row carries its final
//! state relative to `original`. Rows are matched by [`CompoundKey`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::compare::differing_columns;
use crate::config::{DuplicateKeyPolicy, MergeOptions, SchemaMismatchPolicy};
use crate::error::{Result, TablesyncError};
use crate::key::{CompoundKey, KeyCodec};
use crate::schema::{check_tables, SchemaMismatch, Side};
use crate::table::{RowId, RowState, RowStateKind, Table};

/// Row counts per state of a classified table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowChanges {
    pub unchanged: usize,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl RowChanges {
    pub fn total(&self) -> usize {
        self.unchanged + self.added + self.modified + self.deleted
    }

    pub fn has_changes(&self) -> bool {
        self.added + self.modified + self.deleted > 0
    }
}

/// Count the rows of `table` by state
pub fn summarize(table: &Table) -> RowChanges {
    let mut changes = RowChanges::default();
    for row in table.rows() {
        match row.kind() {
            RowStateKind::Unchanged => changes.unchanged += 1,
            RowStateKind::Added => changes.added += 1,
            RowStateKind::Modified => changes.modified += 1,
            RowStateKind::Deleted => changes.deleted += 1,
            RowStateKind::Detached => {}
        }
    }
    changes
}

/// Why a table was left empty instead of merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingPrimaryKey,
    SchemaMismatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingPrimaryKey => f.write_str("no primary key"),
            SkipReason::SchemaMismatch => f.write_str("incompatible schemas"),
        }
    }
}

/// A primary key held by more than one live row on one side of a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub side: Side,
    /// Decoded key fields
    pub key: Vec<String>,
    /// Every row holding the key; the first one was used for matching
    pub rows: Vec<RowId>,
}

/// Diagnostics of one table merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub table: String,
    pub changes: RowChanges,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_mismatches: Vec<SchemaMismatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_keys: Vec<DuplicateKey>,
}

impl MergeReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            changes: RowChanges::default(),
            skipped: None,
            schema_mismatches: Vec::new(),
            duplicate_keys: Vec::new(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

/// Result of [`SnapshotMerger::merge`]
#[derive(Debug, Clone)]
pub struct TableMerge {
    pub table: Table,
    pub report: MergeReport,
}

/// Live rows of one table keyed by compound key. The first row per key wins.
pub(crate) struct KeyIndex {
    entries: IndexMap<CompoundKey, Vec<RowId>>,
}

impl KeyIndex {
    pub(crate) fn build(table: &Table, codec: &KeyCodec) -> Self {
        let mut entries: IndexMap<CompoundKey, Vec<RowId>> = IndexMap::new();
        for row in table.live_rows() {
            entries.entry(codec.encode(row)).or_default().push(row.id());
        }
        Self { entries }
    }

    pub(crate) fn get(&self, key: &CompoundKey) -> Option<RowId> {
        self.entries.get(key).and_then(|rows| rows.first().copied())
    }

    pub(crate) fn contains(&self, key: &CompoundKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn duplicates(&self, side: Side) -> Vec<DuplicateKey> {
        self.entries
            .iter()
            .filter(|(_, rows)| rows.len() > 1)
            .map(|(key, rows)| DuplicateKey {
                side,
                key: key.fields(),
                rows: rows.clone(),
            })
            .collect()
    }
}

/// Reconciles an original snapshot with a changed one
#[derive(Debug, Clone, Default)]
pub struct SnapshotMerger {
    options: MergeOptions,
}

impl SnapshotMerger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Classify every row of `changed` against `original`.
    ///
    /// The output is a schema clone of `original`. Rows derived from
    /// `original` come first in their original order (Deleted, Modified or
    /// Unchanged), followed by the Added rows in `changed` order. Neither
    /// input is modified.
    pub fn merge(&self, original: &Table, changed: &Table) -> Result<TableMerge> {
        let mut report = MergeReport::new(original.name());
        let mut merged = original.clone_schema();

        let mismatches = check_tables(original, changed);
        if !mismatches.is_empty() {
            if self.options.schema_mismatch == SchemaMismatchPolicy::Reject {
                return Err(TablesyncError::SchemaMismatch {
                    table: original.name().to_string(),
                    details: mismatches
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; "),
                });
            }
            log::warn!(
                "Skipping table '{}': {} schema mismatch(es)",
                original.name(),
                mismatches.len()
            );
            report.skipped = Some(SkipReason::SchemaMismatch);
            report.schema_mismatches = mismatches;
            return Ok(TableMerge {
                table: merged,
                report,
            });
        }

        if !original.has_primary_key() {
            if self.options.schema_mismatch == SchemaMismatchPolicy::Reject {
                return Err(TablesyncError::MissingPrimaryKey {
                    table: original.name().to_string(),
                });
            }
            log::warn!("Skipping table '{}': no primary key", original.name());
            report.skipped = Some(SkipReason::MissingPrimaryKey);
            return Ok(TableMerge {
                table: merged,
                report,
            });
        }

        let original_codec = KeyCodec::for_table(original);
        let changed_codec = KeyCodec::for_table(changed);
        let original_index = KeyIndex::build(original, &original_codec);
        let changed_index = KeyIndex::build(changed, &changed_codec);

        report.duplicate_keys = original_index.duplicates(Side::Left);
        report.duplicate_keys.extend(changed_index.duplicates(Side::Right));
        if !report.duplicate_keys.is_empty() {
            if self.options.duplicate_keys == DuplicateKeyPolicy::Reject {
                return Err(TablesyncError::DuplicateKeys {
                    table: original.name().to_string(),
                    keys: report
                        .duplicate_keys
                        .iter()
                        .map(|d| d.key.join("|"))
                        .collect(),
                });
            }
            for duplicate in &report.duplicate_keys {
                log::warn!(
                    "Table '{}': key {:?} held by {} rows on the {} side; first row wins",
                    original.name(),
                    duplicate.key,
                    duplicate.rows.len(),
                    duplicate.side
                );
            }
        }

        log::debug!(
            "Merging table '{}' ({} original rows, {} changed rows)",
            original.name(),
            original.row_count(),
            changed.row_count()
        );

        for row in original.live_rows() {
            let key = original_codec.encode(row);
            let Some(counterpart_id) = changed_index.get(&key) else {
                merged.push_row(
                    row.values().to_vec(),
                    RowState::Deleted {
                        original: row.values().to_vec(),
                    },
                );
                continue;
            };
            if original_index.get(&key) != Some(row.id()) {
                continue;
            }
            let counterpart = changed.require_row(counterpart_id)?;
            if differing_columns(original, row, changed, counterpart).is_empty() {
                merged.push_row(row.values().to_vec(), RowState::Unchanged);
            } else {
                let values = merged.project_values(changed, counterpart.values());
                merged.push_row(
                    values,
                    RowState::Modified {
                        baseline: row.values().to_vec(),
                    },
                );
            }
        }

        for row in changed.live_rows() {
            let key = changed_codec.encode(row);
            if changed_index.get(&key) != Some(row.id()) || original_index.contains(&key) {
                continue;
            }
            let values = merged.project_values(changed, row.values());
            merged.push_row(values, RowState::Added);
        }

        report.changes = summarize(&merged);
        log::info!(
            "Merged table '{}': {} unchanged, {} modified, {} deleted, {} added",
            merged.name(),
            report.changes.unchanged,
            report.changes.modified,
            report.changes.deleted,
            report.changes.added
        );

        Ok(TableMerge {
            table: merged,
            report,
        })
    }
}
