//! Error types for tablesync

use crate::table::RowId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TablesyncError>;

#[derive(Error, Debug)]
pub enum TablesyncError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("Column '{column}' already exists in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Row {row} not found in table '{table}'")]
    RowNotFound { table: String, row: RowId },

    #[error("Row {row} in table '{table}' is deleted; its current values cannot be changed")]
    DeletedRowInaccessible { table: String, row: RowId },

    #[error("Cannot {action} row {row} in table '{table}' while it is {state}")]
    InvalidStateTransition {
        table: String,
        row: RowId,
        state: &'static str,
        action: &'static str,
    },

    #[error("Table '{table}' has no primary key")]
    MissingPrimaryKey { table: String },

    #[error("Schema mismatch for table '{table}': {details}")]
    SchemaMismatch { table: String, details: String },

    #[error("Duplicate primary keys in table '{table}': {}", keys.join(", "))]
    DuplicateKeys { table: String, keys: Vec<String> },

    #[error("Data processing error: {message}")]
    DataProcessing { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TablesyncError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn data_processing(message: impl Into<String>) -> Self {
        Self::DataProcessing {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn column_not_found(table: &str, column: &str) -> Self {
        Self::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn row_not_found(table: &str, row: RowId) -> Self {
        Self::RowNotFound {
            table: table.to_string(),
            row,
        }
    }
}

impl From<anyhow::Error> for TablesyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::config(err.to_string())
    }
}
