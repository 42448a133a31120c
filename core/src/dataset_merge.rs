//! Merging and synchronizing whole datasets table by table

use std::collections::HashSet;

use crate::config::{MergeOptions, SchemaMismatchPolicy};
use crate::dataset::DataSet;
use crate::error::{Result, TablesyncError};
use crate::merge::{MergeReport, SnapshotMerger};
use crate::row_ops::copy_row_to_table;
use crate::schema::check_tables;
use crate::sync::{ChangeBufferSynchronizer, SyncReport};
use crate::table::{Row, RowId};

/// Result of [`DataSetMerger::merge`]
#[derive(Debug, Clone)]
pub struct DataSetMerge {
    pub dataset: DataSet,
    /// One report per table present in both inputs, in `original` order
    pub reports: Vec<MergeReport>,
}

/// Options for [`DataSetMerger::merge_missing_rows`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    /// Create incoming columns the target table lacks
    pub add_absent_columns: bool,
    /// Mirror the incoming row state on the copy (see [`copy_row_to_table`])
    pub update_status: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            add_absent_columns: true,
            update_status: true,
        }
    }
}

/// Applies the snapshot merger or the buffer synchronizer to every pair of
/// same-named tables in two datasets. Tables are independent of each other.
#[derive(Debug, Clone, Default)]
pub struct DataSetMerger {
    options: MergeOptions,
}

impl DataSetMerger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Merge every table of `original` with its namesake in `changed`.
    /// Tables found on one side only are passed through unchanged,
    /// `original`-only ones first.
    pub fn merge(&self, original: &DataSet, changed: &DataSet) -> Result<DataSetMerge> {
        let merger = SnapshotMerger::new(self.options);
        let mut dataset = DataSet::new();
        let mut reports = Vec::new();

        for table in original.tables() {
            match changed.table(table.name()) {
                Some(counterpart) => {
                    let merged = merger.merge(table, counterpart)?;
                    dataset.put_table(merged.table);
                    reports.push(merged.report);
                }
                None => {
                    log::debug!("Table '{}' only in original; passing through", table.name());
                    dataset.put_table(table.clone());
                }
            }
        }

        for table in changed.tables() {
            if !original.contains(table.name()) {
                log::debug!("Table '{}' only in changed; passing through", table.name());
                dataset.put_table(table.clone());
            }
        }

        Ok(DataSetMerge { dataset, reports })
    }

    /// Synchronize every buffer table with its namesake in `current`.
    /// Tables on one side only are left alone; incompatible pairs are
    /// skipped unless the schema mismatch policy rejects them.
    pub fn synchronize(&self, buffer: &mut DataSet, current: &mut DataSet) -> Result<Vec<SyncReport>> {
        let synchronizer = ChangeBufferSynchronizer::new(self.options);
        let names: Vec<String> = buffer
            .table_names()
            .into_iter()
            .filter(|name| current.contains(name))
            .map(str::to_string)
            .collect();

        let mut reports = Vec::with_capacity(names.len());
        for name in names {
            let (Some(buffer_table), Some(current_table)) =
                (buffer.table_mut(&name), current.table_mut(&name))
            else {
                continue;
            };

            let mismatches = check_tables(buffer_table, current_table);
            if !mismatches.is_empty() {
                if self.options.schema_mismatch == SchemaMismatchPolicy::Reject {
                    return Err(TablesyncError::SchemaMismatch {
                        table: name,
                        details: mismatches
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("; "),
                    });
                }
                log::warn!(
                    "Skipping synchronization of table '{}': {} schema mismatch(es)",
                    name,
                    mismatches.len()
                );
                continue;
            }

            reports.push(synchronizer.synchronize(buffer_table, current_table)?);
        }
        Ok(reports)
    }

    /// Append to `original` every incoming row whose key value is not yet
    /// present. `key_columns` maps table names to the single column that
    /// identifies a row. Pairs where either side lacks the table or the
    /// column are skipped, as are incoming rows with a Null key.
    /// Returns the number of rows copied.
    pub fn merge_missing_rows(
        &self,
        original: &mut DataSet,
        incoming: &DataSet,
        key_columns: &[(&str, &str)],
        options: CopyOptions,
    ) -> Result<usize> {
        let mut copied = 0;

        for &(table_name, column) in key_columns {
            let (Some(source), Some(target)) = (incoming.table(table_name), original.table_mut(table_name))
            else {
                log::debug!("No table '{}' on both sides; skipping", table_name);
                continue;
            };
            let (Some(source_ordinal), Some(target_ordinal)) = (source.ordinal(column), target.ordinal(column))
            else {
                log::debug!("Column '{}' missing from table '{}'; skipping", column, table_name);
                continue;
            };

            if options.add_absent_columns {
                let added = target.add_missing_columns(source);
                if added > 0 {
                    log::debug!("Added {} column(s) to table '{}'", added, table_name);
                }
            }

            let mut present: HashSet<String> = target
                .live_rows()
                .map(|row| row.value_at(target_ordinal))
                .filter(|value| !value.is_null())
                .map(ToString::to_string)
                .collect();

            let candidates: Vec<RowId> = source.rows().iter().map(Row::id).collect();
            for id in candidates {
                let key = source.require_row(id)?.value_at(source_ordinal);
                if key.is_null() || present.contains(&key.to_string()) {
                    continue;
                }
                let key = key.to_string();
                let new_id = copy_row_to_table(target, source, id, options.update_status)?;
                if target.require_row(new_id)?.is_live() {
                    present.insert(key);
                }
                copied += 1;
            }
        }

        if copied > 0 {
            log::info!("Copied {} missing row(s)", copied);
        }
        Ok(copied)
    }
}
