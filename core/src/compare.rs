//! Column-wise row comparison

use std::cmp::Ordering;

use crate::table::{Row, Table};
use crate::value::Value;

/// Null-aware equality of two cells. Non-null values are equal iff they
/// render to the same canonical text.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.is_null(), b.is_null()) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => a.to_string() == b.to_string(),
    }
}

/// Sort order for cells: Null first, numbers numerically, dates and booleans
/// natively, everything else by rendered text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    use rust_decimal::prelude::ToPrimitive;
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Number(n) => Some(*n),
        Value::Decimal(d) => d.to_f64(),
        _ => None,
    }
}

/// Compare two rows over the columns of `table_a`, skipping `except_columns`
/// and any column `table_b` does not have.
pub fn rows_equal(
    table_a: &Table,
    row_a: &Row,
    table_b: &Table,
    row_b: &Row,
    except_columns: &[&str],
) -> bool {
    table_a
        .columns()
        .filter(|column| !except_columns.contains(&column.name.as_str()))
        .all(|column| match table_b.ordinal(&column.name) {
            Some(ordinal_b) => values_equal(row_a.value_at(column.ordinal), row_b.value_at(ordinal_b)),
            None => true,
        })
}

/// Columns of `changed_table` whose rendered text differs between the two
/// rows. Null renders as empty text here, so Null and "" count as equal.
/// A column missing from `original_table` compares as empty text.
pub fn differing_columns<'a>(
    original_table: &Table,
    original: &Row,
    changed_table: &'a Table,
    changed: &Row,
) -> Vec<&'a str> {
    changed_table
        .columns()
        .filter(|column| {
            let before = original_table
                .ordinal(&column.name)
                .map(|ordinal| original.value_at(ordinal).to_string())
                .unwrap_or_default();
            let after = changed.value_at(column.ordinal).to_string();
            before != after
        })
        .map(|column| column.name.as_str())
        .collect()
}

/// True when no column of `changed_table` renders differently
pub fn rows_render_equal(
    original_table: &Table,
    original: &Row,
    changed_table: &Table,
    changed: &Row,
) -> bool {
    differing_columns(original_table, original, changed_table, changed).is_empty()
}
