//! Row-level helpers for copying, de-duplicating and rendering rows across tables

use crate::compare::{compare_values, values_equal};
use crate::error::{Result, TablesyncError};
use crate::table::{Row, RowId, RowState, RowStateKind, Table};
use crate::value::Value;

/// True when both rows hold the same rendered values in `table_a`'s primary
/// key columns. False when `table_a` has no key or `table_b` lacks a key column.
pub fn keys_match(table_a: &Table, a: &Row, table_b: &Table, b: &Row) -> bool {
    if !table_a.has_primary_key() {
        return false;
    }
    table_a.primary_key().iter().all(|name| {
        match (table_a.ordinal(name), table_b.ordinal(name)) {
            (Some(i), Some(j)) => a.value_at(i).to_string() == b.value_at(j).to_string(),
            _ => false,
        }
    })
}

/// Copy `row` of `source` into a new row of `target`, by shared column name.
///
/// With `update_status` the new row mirrors the source state: a deleted
/// source gives a committed row that is then deleted, an unchanged or
/// modified source gives a committed row flagged modified. Otherwise, and for
/// added sources, the new row is Added.
pub fn copy_row_to_table(
    target: &mut Table,
    source: &Table,
    row: RowId,
    update_status: bool,
) -> Result<RowId> {
    let source_row = source.require_row(row)?;
    let values = target.project_values(source, source_row.visible_values());
    let state = if update_status {
        match source_row.kind() {
            RowStateKind::Deleted => RowState::Deleted {
                original: values.clone(),
            },
            RowStateKind::Unchanged | RowStateKind::Modified => RowState::Modified {
                baseline: values.clone(),
            },
            RowStateKind::Added | RowStateKind::Detached => RowState::Added,
        }
    } else {
        RowState::Added
    };
    Ok(target.push_row(values, state))
}

/// Insert a copy of `row` before the first target row whose rendered
/// `column` value is not smaller. Appends when either table lacks `column`.
/// Deleted source rows are not copied.
pub fn copy_row_to_sorted_table(
    target: &mut Table,
    source: &Table,
    row: RowId,
    column: &str,
) -> Result<Option<RowId>> {
    let source_row = source.require_row(row)?;
    if !source_row.is_live() {
        return Ok(None);
    }
    let values = target.project_values(source, source_row.values());

    let position = match (target.ordinal(column), source.ordinal(column)) {
        (Some(target_ordinal), Some(source_ordinal)) => {
            let value = source_row.value_at(source_ordinal).to_string();
            target
                .rows()
                .iter()
                .take_while(|r| r.value_at(target_ordinal).to_string() < value)
                .count()
        }
        _ => target.row_count(),
    };

    target.insert_row_at(position, values).map(Some)
}

/// Live rows of `table` sorted by `column`, keeping the first row of each
/// distinct value. The result is a new table whose rows are Added.
pub fn select_distinct(table: &Table, column: &str) -> Result<Table> {
    let ordinal = table.require_ordinal(column)?;
    let mut result = table.clone_schema();
    for row in distinct_rows(table, ordinal) {
        result.add_row(row.values().to_vec())?;
    }
    Ok(result)
}

/// Remove every live row that repeats an earlier row's `column` value.
/// Returns how many rows were removed.
pub fn select_distinct_into(table: &mut Table, column: &str) -> Result<usize> {
    let ordinal = table.require_ordinal(column)?;
    let keep: Vec<RowId> = distinct_rows(table, ordinal).iter().map(|r| r.id()).collect();
    let remove: Vec<RowId> = table
        .live_rows()
        .map(Row::id)
        .filter(|id| !keep.contains(id))
        .collect();
    for id in &remove {
        table.remove_row(*id)?;
    }
    Ok(remove.len())
}

fn distinct_rows(table: &Table, ordinal: usize) -> Vec<&Row> {
    let mut rows: Vec<&Row> = table.live_rows().collect();
    rows.sort_by(|a, b| compare_values(a.value_at(ordinal), b.value_at(ordinal)));

    let mut distinct: Vec<&Row> = Vec::new();
    for row in rows {
        let repeats = distinct
            .last()
            .is_some_and(|last| values_equal(last.value_at(ordinal), row.value_at(ordinal)));
        if !repeats {
            distinct.push(row);
        }
    }
    distinct
}

/// Write `value` only when its rendered text differs from the stored one,
/// treating Null and "" alike. Returns whether a write happened.
pub fn update_column_value(
    table: &mut Table,
    row: RowId,
    column: &str,
    value: impl Into<Value>,
) -> Result<bool> {
    let value = value.into();
    if table.value(row, column)?.to_string() == value.to_string() {
        return Ok(false);
    }
    table.set_value(row, column, value)?;
    Ok(true)
}

/// Render selected columns of `rows` into one delimited string. `None`
/// selects every column. Rows with no selected column are skipped.
pub fn join_rows(
    table: &Table,
    rows: &[RowId],
    columns: Option<&[&str]>,
    column_separator: &str,
    row_separator: &str,
) -> Result<String> {
    if let Some(names) = columns {
        if let Some(missing) = names.iter().find(|name| !table.has_column(name)) {
            return Err(TablesyncError::column_not_found(table.name(), missing));
        }
    }

    let mut rendered = Vec::with_capacity(rows.len());
    for &id in rows {
        let row = table.require_row(id)?;
        let cells: Vec<String> = table
            .columns()
            .filter(|c| columns.map_or(true, |names| names.contains(&c.name.as_str())))
            .map(|c| row.value_at(c.ordinal).to_string())
            .collect();
        if !cells.is_empty() {
            rendered.push(cells.join(column_separator));
        }
    }
    Ok(rendered.join(row_separator))
}
