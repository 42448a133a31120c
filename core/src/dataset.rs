//! Named collections of tables

use indexmap::IndexMap;

use crate::error::{Result, TablesyncError};
use crate::table::Table;

/// An ordered set of tables addressed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    tables: IndexMap<String, Table>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; names must be unique
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(table.name()) {
            return Err(TablesyncError::invalid_input(format!(
                "DataSet already contains a table named '{}'",
                table.name()
            )));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    /// Insert or replace a table by name
    pub fn put_table(&mut self, table: Table) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.values_mut()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Same tables and schemas, no rows
    pub fn clone_schema(&self) -> DataSet {
        DataSet {
            tables: self
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), table.clone_schema()))
                .collect(),
        }
    }

    /// Commit every table
    pub fn accept_changes(&mut self) {
        for table in self.tables.values_mut() {
            table.accept_changes();
        }
    }
}

impl FromIterator<Table> for DataSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut dataset = DataSet::new();
        for table in iter {
            dataset.put_table(table);
        }
        dataset
    }
}
