//! Table and document builders shared by tests across the workspace

use std::path::{Path, PathBuf};

use crate::dataset::DataSet;
use crate::document::save_dataset;
use crate::error::Result;
use crate::table::Table;
use crate::value::DataType;

/// `Item(Code string, Qty integer)` keyed by `Code`, every row committed
pub fn item_table(rows: &[(&str, i64)]) -> Table {
    named_item_table("Item", rows)
}

pub fn named_item_table(name: &str, rows: &[(&str, i64)]) -> Table {
    let mut table = Table::new(name);
    table
        .add_column("Code", DataType::String)
        .expect("fresh table");
    table
        .add_column("Qty", DataType::Integer)
        .expect("fresh table");
    table.set_primary_key(&["Code"]).expect("Code exists");
    for (code, qty) in rows {
        table
            .add_row(vec![(*code).into(), (*qty).into()])
            .expect("two values for two columns");
    }
    table.accept_changes();
    table
}

/// Original `A=10, B=20` against changed `A=15, C=30`
pub fn item_pair() -> (DataSet, DataSet) {
    let original = vec![item_table(&[("A", 10), ("B", 20)])].into_iter().collect();
    let changed = vec![item_table(&[("A", 15), ("C", 30)])].into_iter().collect();
    (original, changed)
}

/// Save `dataset` as `<dir>/<file_name>` and return the path
pub fn write_dataset(dir: &Path, file_name: &str, dataset: &DataSet) -> Result<PathBuf> {
    let path = dir.join(file_name);
    save_dataset(&path, dataset)?;
    Ok(path)
}
