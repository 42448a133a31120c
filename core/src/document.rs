//! JSON interchange format for datasets
//!
//! A document lists tables with their schema, primary key and rows. Each row
//! carries its change state; modified rows carry their baseline and deleted
//! rows their committed values under `original`. Cell values are coerced by
//! the declared column type on load.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::dataset::DataSet;
use crate::error::{Result, TablesyncError};
use crate::table::{Row, RowState, RowStateKind, Table};
use crate::value::{DataType, Value};

/// Version written into every saved document
pub const DOCUMENT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSetDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    pub tables: Vec<TableDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    pub name: String,
    pub columns: Vec<ColumnDocument>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub rows: Vec<RowDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDocument {
    #[serde(default = "default_state")]
    pub state: RowStateKind,
    pub values: IndexMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<IndexMap<String, serde_json::Value>>,
}

fn default_state() -> RowStateKind {
    RowStateKind::Unchanged
}

impl Table {
    pub fn from_document(document: &TableDocument) -> Result<Table> {
        let mut table = Table::new(&document.name);
        for column in &document.columns {
            table.add_column(&column.name, column.data_type)?;
        }
        let key: Vec<&str> = document.primary_key.iter().map(String::as_str).collect();
        table.set_primary_key(&key)?;

        for (index, row) in document.rows.iter().enumerate() {
            let context = |e: TablesyncError| {
                TablesyncError::data_processing(format!(
                    "Table '{}', row {}: {}",
                    document.name, index, e
                ))
            };
            let values = cells_to_values(&table, &row.values).map_err(context)?;
            let original = row
                .original
                .as_ref()
                .map(|cells| cells_to_values(&table, cells))
                .transpose()
                .map_err(context)?;

            let state = match row.state {
                RowStateKind::Unchanged => RowState::Unchanged,
                RowStateKind::Added => RowState::Added,
                RowStateKind::Modified => RowState::Modified {
                    baseline: original.unwrap_or_else(|| values.clone()),
                },
                RowStateKind::Deleted => RowState::Deleted {
                    original: original.unwrap_or_else(|| values.clone()),
                },
                RowStateKind::Detached => {
                    return Err(context(TablesyncError::invalid_input(
                        "detached rows cannot be stored in a table",
                    )))
                }
            };
            table.push_row(values, state);
        }

        Ok(table)
    }

    pub fn to_document(&self) -> TableDocument {
        TableDocument {
            name: self.name().to_string(),
            columns: self
                .columns()
                .map(|c| ColumnDocument {
                    name: c.name.clone(),
                    data_type: c.data_type,
                })
                .collect(),
            primary_key: self.primary_key().to_vec(),
            rows: self.rows().iter().map(|row| row_document(self, row)).collect(),
        }
    }
}

impl DataSet {
    pub fn from_document(document: &DataSetDocument) -> Result<DataSet> {
        if document.version > DOCUMENT_VERSION {
            return Err(TablesyncError::data_processing(format!(
                "Unsupported document version {} (newest known is {})",
                document.version, DOCUMENT_VERSION
            )));
        }
        let mut dataset = DataSet::new();
        for table in &document.tables {
            dataset.add_table(Table::from_document(table)?)?;
        }
        Ok(dataset)
    }

    pub fn to_document(&self) -> DataSetDocument {
        DataSetDocument {
            version: DOCUMENT_VERSION,
            tables: self.tables().map(Table::to_document).collect(),
        }
    }
}

fn cells_to_values(table: &Table, cells: &IndexMap<String, serde_json::Value>) -> Result<Vec<Value>> {
    let mut values = table.empty_values();
    for (name, json) in cells {
        let column = table
            .column(name)
            .ok_or_else(|| TablesyncError::column_not_found(table.name(), name))?;
        values[column.ordinal] = Value::from_json(json, column.data_type)?;
    }
    Ok(values)
}

fn values_to_cells(table: &Table, values: &[Value]) -> IndexMap<String, serde_json::Value> {
    table
        .columns()
        .map(|c| {
            let json = values.get(c.ordinal).map(Value::to_json).unwrap_or_default();
            (c.name.clone(), json)
        })
        .collect()
}

fn row_document(table: &Table, row: &Row) -> RowDocument {
    let original = match row.state() {
        RowState::Modified { baseline } => Some(values_to_cells(table, baseline)),
        RowState::Deleted { original } => Some(values_to_cells(table, original)),
        _ => None,
    };
    RowDocument {
        state: row.kind(),
        values: values_to_cells(table, row.values()),
        original,
    }
}

pub fn parse_dataset(json: &str) -> Result<DataSet> {
    let document: DataSetDocument = serde_json::from_str(json)?;
    DataSet::from_document(&document)
}

pub fn load_dataset(path: &Path) -> Result<DataSet> {
    log::debug!("Loading dataset from {}", path.display());
    let content = fs::read_to_string(path)?;
    parse_dataset(&content).map_err(|e| match e {
        TablesyncError::Json(err) => TablesyncError::data_processing(format!(
            "Invalid dataset document '{}': {}",
            path.display(),
            err
        )),
        other => other,
    })
}

pub fn save_dataset(path: &Path, dataset: &DataSet) -> Result<()> {
    let content = serde_json::to_string_pretty(&dataset.to_document())?;
    fs::write(path, content)?;
    log::debug!("Saved dataset to {}", path.display());
    Ok(())
}
