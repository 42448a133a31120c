//! # tablesync-core
//!
//! Core library for tablesync - reconciliation of independently evolved
//! snapshots of tabular data.
//!
//! Two snapshots of the same table are merged into one where every row is
//! classified as unchanged, added, modified or deleted ([`SnapshotMerger`]),
//! and a buffer of pending edits can be folded into a refreshed table without
//! losing work ([`ChangeBufferSynchronizer`]). [`DataSetMerger`] applies both
//! across every table of two datasets.
//!
//! This crate provides the core functionality used by the `tablesync` CLI.

pub mod compare;
pub mod config;
pub mod dataset;
pub mod dataset_merge;
pub mod document;
pub mod error;
pub mod key;
pub mod merge;
pub mod row_ops;
pub mod schema;
pub mod sync;
pub mod table;
pub mod value;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_fixtures;

// Re-export the most commonly used types for convenience
pub use config::{Config, DuplicateKeyPolicy, MergeOptions, SchemaMismatchPolicy};
pub use dataset::DataSet;
pub use dataset_merge::{CopyOptions, DataSetMerge, DataSetMerger};
pub use document::{load_dataset, save_dataset, DataSetDocument, DOCUMENT_VERSION};
pub use error::{Result, TablesyncError};
pub use key::{CompoundKey, KeyCodec};
pub use merge::{summarize, MergeReport, RowChanges, SnapshotMerger, TableMerge};
pub use schema::{check_datasets, check_tables, datasets_compatible, tables_compatible, SchemaMismatch};
pub use sync::{ChangeBufferSynchronizer, SyncReport};
pub use table::{Column, Row, RowId, RowState, RowStateKind, Table};
pub use value::{DataType, Value};
