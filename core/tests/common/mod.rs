//! Common test utilities and fixtures

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tablesync_core::{DataSet, DataType, Table, Value};
use tempfile::TempDir;

/// Fluent builder for keyed test tables
pub struct TableBuilder {
    table: Table,
}

impl TableBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            table: Table::new(name),
        }
    }

    pub fn column(mut self, name: &str, data_type: DataType) -> Self {
        self.table
            .add_column(name, data_type)
            .expect("Failed to add column");
        self
    }

    pub fn key(mut self, columns: &[&str]) -> Self {
        self.table
            .set_primary_key(columns)
            .expect("Failed to set primary key");
        self
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.table.add_row(values).expect("Failed to add row");
        self
    }

    /// Finish with every row committed
    pub fn committed(mut self) -> Table {
        self.table.accept_changes();
        self.table
    }

    /// Finish leaving rows in state Added
    pub fn pending(self) -> Table {
        self.table
    }
}

/// `Item(Code, Qty)` keyed by `Code` with committed rows
pub fn items(rows: &[(&str, i64)]) -> Table {
    rows.iter()
        .fold(
            TableBuilder::new("Item")
                .column("Code", DataType::String)
                .column("Qty", DataType::Integer)
                .key(&["Code"]),
            |builder, (code, qty)| builder.row(vec![(*code).into(), (*qty).into()]),
        )
        .committed()
}

/// Rendered `(code, state)` pairs of a table, in row order
pub fn codes_and_states(table: &Table) -> Vec<(String, String)> {
    table
        .rows()
        .iter()
        .map(|row| (row.value_at(0).to_string(), row.kind().to_string()))
        .collect()
}

pub fn find_row<'a>(table: &'a Table, code: &str) -> Option<&'a tablesync_core::Row> {
    table
        .rows()
        .iter()
        .find(|row| row.value_at(0).to_string() == code)
}

/// A temporary directory for documents and config files
pub struct TestWorkspace {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().to_path_buf();
        Self { temp_dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write raw text (a JSON document or a TOML config) into the workspace
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let target = self.path.join(name);
        fs::write(&target, content).expect("Failed to write file");
        target
    }

    pub fn save(&self, name: &str, dataset: &DataSet) -> PathBuf {
        let target = self.path.join(name);
        tablesync_core::save_dataset(&target, dataset).expect("Failed to save dataset");
        target
    }
}
