//! In-memory tables with per-row change tracking
//!
//! A [`Table`] owns an ordered set of [`Column`]s, an ordered list of [`Row`]s
//! and an optional primary key. Every row carries its change state as data:
//! a modified row holds its committed baseline, a deleted row holds the values
//! it had when it was last committed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Result, TablesyncError};
use crate::value::{DataType, Value};

/// Stable identity of a row within its table
pub type RowId = u64;

static NULL: Value = Value::Null;

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub ordinal: usize,
}

/// Change state of a row
#[derive(Debug, Clone, PartialEq)]
pub enum RowState {
    Unchanged,
    Added,
    /// Values changed since the last commit; `baseline` holds the committed values
    Modified { baseline: Vec<Value> },
    /// Deleted but not yet finalized; `original` holds the committed values
    Deleted { original: Vec<Value> },
    /// Removed from its table
    Detached,
}

/// Payload-free discriminant of [`RowState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStateKind {
    Unchanged,
    Added,
    Modified,
    Deleted,
    Detached,
}

impl RowState {
    pub fn kind(&self) -> RowStateKind {
        match self {
            RowState::Unchanged => RowStateKind::Unchanged,
            RowState::Added => RowStateKind::Added,
            RowState::Modified { .. } => RowStateKind::Modified,
            RowState::Deleted { .. } => RowStateKind::Deleted,
            RowState::Detached => RowStateKind::Detached,
        }
    }
}

impl RowStateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStateKind::Unchanged => "unchanged",
            RowStateKind::Added => "added",
            RowStateKind::Modified => "modified",
            RowStateKind::Deleted => "deleted",
            RowStateKind::Detached => "detached",
        }
    }
}

impl fmt::Display for RowStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    values: Vec<Value>,
    state: RowState,
}

impl Row {
    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn state(&self) -> &RowState {
        &self.state
    }

    pub fn kind(&self) -> RowStateKind {
        self.state.kind()
    }

    /// Current values. For a deleted row these are the values at deletion time.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Last committed values, if the row has ever been committed
    pub fn original_values(&self) -> Option<&[Value]> {
        match &self.state {
            RowState::Unchanged => Some(&self.values),
            RowState::Modified { baseline } => Some(baseline),
            RowState::Deleted { original } => Some(original),
            RowState::Added | RowState::Detached => None,
        }
    }

    /// Values readers should see: committed values for deleted rows, current otherwise
    pub fn visible_values(&self) -> &[Value] {
        match &self.state {
            RowState::Deleted { original } => original,
            _ => &self.values,
        }
    }

    pub fn value_at(&self, ordinal: usize) -> &Value {
        self.visible_values().get(ordinal).unwrap_or(&NULL)
    }

    /// Neither deleted nor detached
    pub fn is_live(&self) -> bool {
        !matches!(self.state, RowState::Deleted { .. } | RowState::Detached)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.state, RowState::Deleted { .. })
    }

    fn pad_to(&mut self, width: usize) {
        self.values.resize(width, Value::Null);
        match &mut self.state {
            RowState::Modified { baseline } => baseline.resize(width, Value::Null),
            RowState::Deleted { original } => original.resize(width, Value::Null),
            _ => {}
        }
    }
}

/// An in-memory table snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: IndexMap<String, Column>,
    primary_key: Vec<String>,
    rows: Vec<Row>,
    /// Row id to position in `rows`
    positions: HashMap<RowId, usize>,
    next_row_id: RowId,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            primary_key: Vec::new(),
            rows: Vec::new(),
            positions: HashMap::new(),
            next_row_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---- schema ----

    /// Append a column; existing rows get Null in it
    pub fn add_column(&mut self, name: &str, data_type: DataType) -> Result<usize> {
        if self.columns.contains_key(name) {
            return Err(TablesyncError::DuplicateColumn {
                table: self.name.clone(),
                column: name.to_string(),
            });
        }
        let ordinal = self.columns.len();
        self.columns.insert(
            name.to_string(),
            Column {
                name: name.to_string(),
                data_type,
                ordinal,
            },
        );
        let width = self.columns.len();
        for row in &mut self.rows {
            row.pad_to(width);
        }
        Ok(ordinal)
    }

    /// Ordinal of `name`, adding the column first when it is missing
    pub fn ensure_column(&mut self, name: &str, data_type: DataType) -> usize {
        match self.columns.get(name) {
            Some(column) => column.ordinal,
            None => {
                let ordinal = self.columns.len();
                log::debug!("Adding missing column '{}' to table '{}'", name, self.name);
                self.columns.insert(
                    name.to_string(),
                    Column {
                        name: name.to_string(),
                        data_type,
                        ordinal,
                    },
                );
                for row in &mut self.rows {
                    row.pad_to(ordinal + 1);
                }
                ordinal
            }
        }
    }

    /// Add every column of `other` that this table lacks; returns how many were added
    pub fn add_missing_columns(&mut self, other: &Table) -> usize {
        let before = self.columns.len();
        for column in other.columns() {
            self.ensure_column(&column.name, column.data_type);
        }
        self.columns.len() - before
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.columns.get(name).map(|c| c.ordinal)
    }

    pub fn require_ordinal(&self, name: &str) -> Result<usize> {
        self.ordinal(name)
            .ok_or_else(|| TablesyncError::column_not_found(&self.name, name))
    }

    /// Declare the primary key. Every named column must exist.
    pub fn set_primary_key(&mut self, columns: &[&str]) -> Result<()> {
        let mut key = Vec::with_capacity(columns.len());
        for &name in columns {
            self.require_ordinal(name)?;
            if key.iter().any(|k: &String| k == name) {
                return Err(TablesyncError::invalid_input(format!(
                    "Column '{}' listed twice in primary key of table '{}'",
                    name, self.name
                )));
            }
            key.push(name.to_string());
        }
        self.primary_key = key;
        Ok(())
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Copy of the schema (name, columns, primary key) without rows
    pub fn clone_schema(&self) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            primary_key: self.primary_key.clone(),
            rows: Vec::new(),
            positions: HashMap::new(),
            next_row_id: 0,
        }
    }

    // ---- rows ----

    /// A value vector of the right width, all Null
    pub fn empty_values(&self) -> Vec<Value> {
        vec![Value::Null; self.columns.len()]
    }

    /// Append a new row in state Added
    pub fn add_row(&mut self, values: Vec<Value>) -> Result<RowId> {
        self.check_width(&values)?;
        Ok(self.push_row(values, RowState::Added))
    }

    /// Append a new Added row from `(column, value)` pairs; unnamed columns are Null
    pub fn add_named_row(&mut self, cells: &[(&str, Value)]) -> Result<RowId> {
        let mut values = self.empty_values();
        for (name, value) in cells {
            let ordinal = self.require_ordinal(name)?;
            values[ordinal] = value.clone();
        }
        Ok(self.push_row(values, RowState::Added))
    }

    /// Insert a new Added row at `index` (clamped to the row count)
    pub fn insert_row_at(&mut self, index: usize, values: Vec<Value>) -> Result<RowId> {
        self.check_width(&values)?;
        let id = self.allocate_id();
        let index = index.min(self.rows.len());
        self.rows.insert(
            index,
            Row {
                id,
                values,
                state: RowState::Added,
            },
        );
        self.reindex_from(index);
        Ok(id)
    }

    pub(crate) fn push_row(&mut self, values: Vec<Value>, state: RowState) -> RowId {
        let id = self.allocate_id();
        let mut row = Row { id, values, state };
        row.pad_to(self.columns.len());
        self.positions.insert(id, self.rows.len());
        self.rows.push(row);
        id
    }

    /// Refresh `positions` for every row at or after `start`
    fn reindex_from(&mut self, start: usize) {
        for (position, row) in self.rows.iter().enumerate().skip(start) {
            self.positions.insert(row.id, position);
        }
    }

    /// Overwrite a row's values and state wholesale
    pub(crate) fn replace_row(&mut self, id: RowId, values: Vec<Value>, state: RowState) -> Result<()> {
        let width = self.columns.len();
        let row = self.row_mut(id)?;
        row.values = values;
        row.state = state;
        row.pad_to(width);
        Ok(())
    }

    fn allocate_id(&mut self) -> RowId {
        let id = self.next_row_id;
        self.next_row_id += 1;
        id
    }

    fn check_width(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(TablesyncError::invalid_input(format!(
                "Table '{}' has {} columns but {} values were supplied",
                self.name,
                self.columns.len(),
                values.len()
            )));
        }
        Ok(())
    }

    /// All rows in order, deleted ones included
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn live_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.is_live())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.positions.get(&id).map(|&position| &self.rows[position])
    }

    pub fn require_row(&self, id: RowId) -> Result<&Row> {
        self.row(id)
            .ok_or_else(|| TablesyncError::row_not_found(&self.name, id))
    }

    fn row_mut(&mut self, id: RowId) -> Result<&mut Row> {
        match self.positions.get(&id) {
            Some(&position) => Ok(&mut self.rows[position]),
            None => Err(TablesyncError::row_not_found(&self.name, id)),
        }
    }

    /// Read a cell; deleted rows answer with their committed values
    pub fn value(&self, id: RowId, column: &str) -> Result<&Value> {
        let ordinal = self.require_ordinal(column)?;
        Ok(self.require_row(id)?.value_at(ordinal))
    }

    /// Write a cell. An Unchanged row becomes Modified with its prior values as baseline.
    pub fn set_value(&mut self, id: RowId, column: &str, value: impl Into<Value>) -> Result<()> {
        let ordinal = self.require_ordinal(column)?;
        let table = self.name.clone();
        let row = self.row_mut(id)?;
        match row.state {
            RowState::Deleted { .. } => {
                return Err(TablesyncError::DeletedRowInaccessible { table, row: id })
            }
            RowState::Unchanged => {
                row.state = RowState::Modified {
                    baseline: row.values.clone(),
                };
            }
            _ => {}
        }
        row.values[ordinal] = value.into();
        Ok(())
    }

    /// Commit one row: Added/Modified become Unchanged, Deleted rows are finalized
    pub fn accept_row_changes(&mut self, id: RowId) -> Result<()> {
        match self.require_row(id)?.kind() {
            RowStateKind::Added | RowStateKind::Modified => {
                self.row_mut(id)?.state = RowState::Unchanged;
            }
            RowStateKind::Deleted => {
                self.remove_row(id)?;
            }
            RowStateKind::Unchanged | RowStateKind::Detached => {}
        }
        Ok(())
    }

    /// Commit every row
    pub fn accept_changes(&mut self) {
        self.rows.retain(|r| r.is_live());
        for row in &mut self.rows {
            row.state = RowState::Unchanged;
        }
        self.positions.clear();
        self.reindex_from(0);
    }

    /// Mark a row deleted. An Added row has nothing committed to fall back to,
    /// so it is detached and removed instead. Deleting a deleted row is a no-op.
    pub fn delete_row(&mut self, id: RowId) -> Result<()> {
        if self.require_row(id)?.kind() == RowStateKind::Added {
            self.remove_row(id)?;
            return Ok(());
        }
        let row = self.row_mut(id)?;
        let original = match &row.state {
            RowState::Unchanged => row.values.clone(),
            RowState::Modified { baseline } => baseline.clone(),
            _ => return Ok(()),
        };
        row.state = RowState::Deleted { original };
        Ok(())
    }

    /// Flag an Unchanged row as Added
    pub fn set_added(&mut self, id: RowId) -> Result<()> {
        let table = self.name.clone();
        let row = self.row_mut(id)?;
        if row.state != RowState::Unchanged {
            return Err(TablesyncError::InvalidStateTransition {
                table,
                row: id,
                state: row.kind().as_str(),
                action: "set added on",
            });
        }
        row.state = RowState::Added;
        Ok(())
    }

    /// Flag an Unchanged row as Modified, its current values becoming the baseline
    pub fn set_modified(&mut self, id: RowId) -> Result<()> {
        let table = self.name.clone();
        let row = self.row_mut(id)?;
        if row.state != RowState::Unchanged {
            return Err(TablesyncError::InvalidStateTransition {
                table,
                row: id,
                state: row.kind().as_str(),
                action: "set modified on",
            });
        }
        row.state = RowState::Modified {
            baseline: row.values.clone(),
        };
        Ok(())
    }

    /// Detach a row from the table and hand it back
    pub fn remove_row(&mut self, id: RowId) -> Result<Row> {
        let position = self
            .positions
            .remove(&id)
            .ok_or_else(|| TablesyncError::row_not_found(&self.name, id))?;
        let mut row = self.rows.remove(position);
        self.reindex_from(position);
        row.state = RowState::Detached;
        Ok(row)
    }

    /// Remove every row whose id is in `ids` in one pass; returns how many went
    pub fn remove_rows(&mut self, ids: &HashSet<RowId>) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| !ids.contains(&r.id));
        let removed = before - self.rows.len();
        if removed > 0 {
            self.positions.clear();
            self.reindex_from(0);
        }
        removed
    }

    /// Remove every row; the schema is kept
    pub fn clear(&mut self) {
        self.rows.clear();
        self.positions.clear();
    }

    /// Replace schema and rows with an exact copy of `other`, keeping this table's name
    pub fn reload_from(&mut self, other: &Table) {
        self.columns = other.columns.clone();
        self.primary_key = other.primary_key.clone();
        self.rows = other.rows.clone();
        self.positions = other.positions.clone();
        self.next_row_id = other.next_row_id;
    }

    /// Map values laid out for `source` onto this table's columns by name.
    /// Columns this table has but `source` lacks come out Null.
    pub fn project_values(&self, source: &Table, values: &[Value]) -> Vec<Value> {
        self.columns()
            .map(|column| {
                source
                    .ordinal(&column.name)
                    .and_then(|i| values.get(i))
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_table() -> Table {
        let mut table = Table::new("Item");
        table.add_column("Code", DataType::String).unwrap();
        table.add_column("Qty", DataType::Integer).unwrap();
        table.set_primary_key(&["Code"]).unwrap();
        table
    }

    #[test]
    fn test_new_rows_are_added_until_committed() {
        let mut table = item_table();
        let id = table.add_row(vec!["A".into(), 10.into()]).unwrap();
        assert_eq!(table.require_row(id).unwrap().kind(), RowStateKind::Added);
        assert!(table.require_row(id).unwrap().original_values().is_none());

        table.accept_changes();
        let row = table.require_row(id).unwrap();
        assert_eq!(row.kind(), RowStateKind::Unchanged);
        assert_eq!(row.original_values().unwrap(), row.values());
    }

    #[test]
    fn test_set_value_keeps_baseline() {
        let mut table = item_table();
        let id = table.add_row(vec!["A".into(), 10.into()]).unwrap();
        table.accept_changes();

        table.set_value(id, "Qty", 15).unwrap();
        table.set_value(id, "Qty", 20).unwrap();

        let row = table.require_row(id).unwrap();
        assert_eq!(
            row.state(),
            &RowState::Modified {
                baseline: vec!["A".into(), 10.into()]
            }
        );
        assert_eq!(row.values()[1], Value::Integer(20));
    }

    #[test]
    fn test_delete_preserves_committed_values() {
        let mut table = item_table();
        let id = table.add_row(vec!["A".into(), 10.into()]).unwrap();
        table.accept_changes();
        table.set_value(id, "Qty", 99).unwrap();
        table.delete_row(id).unwrap();

        let row = table.require_row(id).unwrap();
        assert!(row.is_deleted());
        assert_eq!(row.values()[1], Value::Integer(99));
        assert_eq!(table.value(id, "Qty").unwrap(), &Value::Integer(10));

        let err = table.set_value(id, "Qty", 1).unwrap_err();
        assert!(matches!(err, TablesyncError::DeletedRowInaccessible { .. }));

        table.accept_changes();
        assert!(table.row(id).is_none());
    }

    #[test]
    fn test_deleting_added_row_detaches_it() {
        let mut table = item_table();
        let id = table.add_row(vec!["A".into(), 1.into()]).unwrap();
        table.delete_row(id).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_state_flags_require_unchanged_rows() {
        let mut table = item_table();
        let id = table.add_row(vec!["A".into(), 1.into()]).unwrap();
        assert!(table.set_modified(id).is_err());

        table.accept_row_changes(id).unwrap();
        table.set_modified(id).unwrap();
        assert_eq!(table.require_row(id).unwrap().kind(), RowStateKind::Modified);

        table.accept_row_changes(id).unwrap();
        table.set_added(id).unwrap();
        assert_eq!(table.require_row(id).unwrap().kind(), RowStateKind::Added);
    }

    #[test]
    fn test_add_column_pads_rows_and_baselines() {
        let mut table = item_table();
        let id = table.add_row(vec!["A".into(), 1.into()]).unwrap();
        table.accept_changes();
        table.set_value(id, "Qty", 2).unwrap();

        let ordinal = table.add_column("Note", DataType::String).unwrap();
        assert_eq!(ordinal, 2);
        let row = table.require_row(id).unwrap();
        assert_eq!(row.values().len(), 3);
        assert_eq!(row.original_values().unwrap().len(), 3);
        assert!(table.add_column("Note", DataType::String).is_err());
        assert_eq!(table.ensure_column("Note", DataType::String), 2);
    }

    #[test]
    fn test_primary_key_must_name_existing_columns() {
        let mut table = item_table();
        assert!(table.set_primary_key(&["Missing"]).is_err());
        assert!(table.set_primary_key(&["Code", "Code"]).is_err());
        assert_eq!(table.primary_key(), &["Code".to_string()]);
    }

    #[test]
    fn test_clone_schema_drops_rows() {
        let mut table = item_table();
        table.add_row(vec!["A".into(), 1.into()]).unwrap();
        let clone = table.clone_schema();
        assert!(clone.is_empty());
        assert_eq!(clone.column_names(), vec!["Code", "Qty"]);
        assert_eq!(clone.primary_key(), table.primary_key());
    }

    #[test]
    fn test_add_row_checks_width() {
        let mut table = item_table();
        assert!(table.add_row(vec!["A".into()]).is_err());
        assert!(table.add_named_row(&[("Nope", Value::Null)]).is_err());
        let id = table.add_named_row(&[("Code", "B".into())]).unwrap();
        assert_eq!(table.value(id, "Qty").unwrap(), &Value::Null);
    }

    #[test]
    fn test_row_lookup_follows_inserts_and_removals() {
        let mut table = item_table();
        let a = table.add_row(vec!["A".into(), 1.into()]).unwrap();
        let b = table.add_row(vec!["B".into(), 2.into()]).unwrap();
        let c = table.add_row(vec!["C".into(), 3.into()]).unwrap();
        let front = table.insert_row_at(0, vec!["F".into(), 0.into()]).unwrap();

        assert_eq!(table.value(front, "Code").unwrap(), &Value::from("F"));
        assert_eq!(table.value(c, "Code").unwrap(), &Value::from("C"));

        table.remove_row(a).unwrap();
        assert!(table.row(a).is_none());
        assert_eq!(table.value(b, "Qty").unwrap(), &Value::Integer(2));

        let removed = table.remove_rows(&HashSet::from([front, c]));
        assert_eq!(removed, 2);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows()[0].id(), b);
        table.set_value(b, "Qty", 20).unwrap();
        assert_eq!(table.value(b, "Qty").unwrap(), &Value::Integer(20));
        assert!(table.require_row(c).is_err());
    }

    #[test]
    fn test_project_values_by_name() {
        let source = item_table();
        let mut target = Table::new("Item");
        target.add_column("Qty", DataType::Integer).unwrap();
        target.add_column("Extra", DataType::String).unwrap();
        target.add_column("Code", DataType::String).unwrap();

        let projected = target.project_values(&source, &["A".into(), 5.into()]);
        assert_eq!(projected, vec![Value::Integer(5), Value::Null, "A".into()]);
    }
}
