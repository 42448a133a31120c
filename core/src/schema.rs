//! Schema compatibility checks between tables and datasets

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataset::DataSet;
use crate::table::Table;
use crate::value::DataType;

/// One reason two schemas are not merge-compatible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaMismatch {
    TableCount {
        left: usize,
        right: usize,
    },
    MissingTable {
        table: String,
        missing_from: Side,
    },
    ColumnCount {
        table: String,
        left: usize,
        right: usize,
    },
    PrimaryKeyArity {
        table: String,
        left: usize,
        right: usize,
    },
    MissingColumn {
        table: String,
        column: String,
    },
    TypeMismatch {
        table: String,
        column: String,
        left: DataType,
        right: DataType,
    },
    ColumnOrder {
        table: String,
        column: String,
        left: usize,
        right: usize,
    },
}

/// Which of the two compared inputs something refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaMismatch::TableCount { left, right } => {
                write!(f, "table count differs ({left} vs {right})")
            }
            SchemaMismatch::MissingTable {
                table,
                missing_from,
            } => write!(f, "table '{table}' is missing from the {missing_from} side"),
            SchemaMismatch::ColumnCount { table, left, right } => {
                write!(f, "{table}: column count differs ({left} vs {right})")
            }
            SchemaMismatch::PrimaryKeyArity { table, left, right } => {
                write!(f, "{table}: primary key arity differs ({left} vs {right})")
            }
            SchemaMismatch::MissingColumn { table, column } => {
                write!(f, "{table}: column '{column}' is missing on the right side")
            }
            SchemaMismatch::TypeMismatch {
                table,
                column,
                left,
                right,
            } => write!(f, "{table}.{column}: type {left} vs {right}"),
            SchemaMismatch::ColumnOrder {
                table,
                column,
                left,
                right,
            } => write!(f, "{table}.{column}: position {left} vs {right}"),
        }
    }
}

/// Every schema difference that blocks merging `left` with `right`
pub fn check_tables(left: &Table, right: &Table) -> Vec<SchemaMismatch> {
    let table = left.name().to_string();
    let mut mismatches = Vec::new();

    if left.column_count() != right.column_count() {
        mismatches.push(SchemaMismatch::ColumnCount {
            table: table.clone(),
            left: left.column_count(),
            right: right.column_count(),
        });
    }

    if left.primary_key().len() != right.primary_key().len() {
        mismatches.push(SchemaMismatch::PrimaryKeyArity {
            table: table.clone(),
            left: left.primary_key().len(),
            right: right.primary_key().len(),
        });
    }

    for column in left.columns() {
        let Some(other) = right.column(&column.name) else {
            mismatches.push(SchemaMismatch::MissingColumn {
                table: table.clone(),
                column: column.name.clone(),
            });
            continue;
        };
        if column.data_type != other.data_type {
            mismatches.push(SchemaMismatch::TypeMismatch {
                table: table.clone(),
                column: column.name.clone(),
                left: column.data_type,
                right: other.data_type,
            });
        }
        if column.ordinal != other.ordinal {
            mismatches.push(SchemaMismatch::ColumnOrder {
                table: table.clone(),
                column: column.name.clone(),
                left: column.ordinal,
                right: other.ordinal,
            });
        }
    }

    mismatches
}

pub fn tables_compatible(left: &Table, right: &Table) -> bool {
    check_tables(left, right).is_empty()
}

/// Every schema difference between two datasets, table by table
pub fn check_datasets(left: &DataSet, right: &DataSet) -> Vec<SchemaMismatch> {
    let mut mismatches = Vec::new();

    if left.len() != right.len() {
        mismatches.push(SchemaMismatch::TableCount {
            left: left.len(),
            right: right.len(),
        });
    }

    for table in left.tables() {
        match right.table(table.name()) {
            Some(other) => mismatches.extend(check_tables(table, other)),
            None => mismatches.push(SchemaMismatch::MissingTable {
                table: table.name().to_string(),
                missing_from: Side::Right,
            }),
        }
    }

    for table in right.tables() {
        if !left.contains(table.name()) {
            mismatches.push(SchemaMismatch::MissingTable {
                table: table.name().to_string(),
                missing_from: Side::Left,
            });
        }
    }

    mismatches
}

pub fn datasets_compatible(left: &DataSet, right: &DataSet) -> bool {
    check_datasets(left, right).is_empty()
}
