mod common;

use common::{codes_and_states, find_row, items, TableBuilder};
use tablesync_core::schema::Side;
use tablesync_core::{
    ChangeBufferSynchronizer, DataType, Result, Row, RowStateKind, Table, TablesyncError, Value,
};

fn row_by_code<'a>(table: &'a Table, code: &str) -> Option<&'a Row> {
    let ordinal = table.ordinal("Code")?;
    table
        .rows()
        .iter()
        .find(|row| row.value_at(ordinal).to_string() == code)
}

#[test]
fn test_new_buffer_row_reaches_current_and_comes_back() -> Result<()> {
    let mut current = items(&[("A", 1)]);
    let mut buffer = current.clone();
    buffer.add_row(vec!["X".into(), 42.into()])?;

    let report = ChangeBufferSynchronizer::default().synchronize(&mut buffer, &mut current)?;
    assert_eq!(report.reapplied, 1);
    assert_eq!(report.pending, 1);

    let x = find_row(&current, "X").expect("X copied into current");
    assert_eq!(x.values()[1], Value::Integer(42));
    assert!(find_row(&buffer, "X").is_some());
    assert_eq!(buffer.rows(), current.rows());
    Ok(())
}

#[test]
fn test_current_rows_the_buffer_does_not_hold_are_deleted() -> Result<()> {
    // B was deleted in the buffer; C arrived with the refresh but the buffer never saw it
    let mut buffer = items(&[("A", 1), ("B", 2)]);
    let mut current = items(&[("A", 1), ("B", 2), ("C", 3)]);
    let b = find_row(&buffer, "B").unwrap().id();
    buffer.delete_row(b)?;

    let report = ChangeBufferSynchronizer::default().synchronize(&mut buffer, &mut current)?;

    assert_eq!(report.deleted, 2);
    assert_eq!(
        codes_and_states(&current),
        vec![
            ("A".to_string(), "unchanged".to_string()),
            ("B".to_string(), "deleted".to_string()),
            ("C".to_string(), "deleted".to_string()),
        ]
    );
    assert_eq!(codes_and_states(&buffer), codes_and_states(&current));
    Ok(())
}

#[test]
fn test_synchronize_is_a_fixpoint() -> Result<()> {
    let mut buffer = items(&[("A", 1), ("B", 2), ("D", 4)]);
    let mut current = items(&[("A", 1), ("B", 20), ("C", 3)]);
    let a = find_row(&buffer, "A").unwrap().id();
    buffer.set_value(a, "Qty", 10)?;
    let d = find_row(&buffer, "D").unwrap().id();
    buffer.delete_row(d)?;
    buffer.add_row(vec!["E".into(), 5.into()])?;

    let synchronizer = ChangeBufferSynchronizer::default();
    synchronizer.synchronize(&mut buffer, &mut current)?;
    let snapshot = (buffer.clone(), current.clone());

    let second = synchronizer.synchronize(&mut buffer, &mut current)?;
    assert_eq!(buffer, snapshot.0);
    assert_eq!(current, snapshot.1);
    assert_eq!(second.reapplied, 0);
    assert_eq!(second.finalized, 0);
    assert_eq!(second.deleted, 0);
    Ok(())
}

#[test]
fn test_pending_modification_keeps_its_baseline() -> Result<()> {
    let mut buffer = items(&[("A", 1)]);
    let mut current = items(&[("A", 1)]);
    let a = find_row(&buffer, "A").unwrap().id();
    buffer.set_value(a, "Qty", 2)?;

    ChangeBufferSynchronizer::default().synchronize(&mut buffer, &mut current)?;

    let row = find_row(&current, "A").unwrap();
    assert_eq!(row.kind(), RowStateKind::Modified);
    assert_eq!(row.values()[1], Value::Integer(2));
    assert_eq!(row.original_values().unwrap()[1], Value::Integer(1));
    Ok(())
}

#[test]
fn test_keyless_tables_are_rejected_before_mutation() -> Result<()> {
    let keyless = TableBuilder::new("Item")
        .column("Code", DataType::String)
        .column("Qty", DataType::Integer)
        .row(vec!["A".into(), 1.into()])
        .committed();
    let mut buffer = keyless.clone();
    let mut current = items(&[("A", 1)]);
    let before = current.clone();

    let result = ChangeBufferSynchronizer::default().synchronize(&mut buffer, &mut current);
    assert!(matches!(result, Err(TablesyncError::MissingPrimaryKey { .. })));
    assert_eq!(current, before);
    assert_eq!(buffer, keyless);
    Ok(())
}

#[test]
fn test_buffer_key_column_missing_from_current_is_rejected() -> Result<()> {
    let mut buffer = TableBuilder::new("Item")
        .column("Sku", DataType::String)
        .key(&["Sku"])
        .committed();
    let mut current = items(&[("A", 1)]);

    let result = ChangeBufferSynchronizer::default().synchronize(&mut buffer, &mut current);
    assert!(matches!(result, Err(TablesyncError::ColumnNotFound { .. })));
    Ok(())
}

#[test]
fn test_keys_match_by_column_name_across_layouts() -> Result<()> {
    let mut current = TableBuilder::new("Item")
        .column("Qty", DataType::Integer)
        .column("Code", DataType::String)
        .key(&["Code"])
        .row(vec![1.into(), "A".into()])
        .row(vec![2.into(), "B".into()])
        .committed();
    let mut buffer = items(&[("A", 1), ("B", 2)]);
    let a = find_row(&buffer, "A").unwrap().id();
    buffer.set_value(a, "Qty", 7)?;
    buffer.add_row(vec!["X".into(), 9.into()])?;

    let report = ChangeBufferSynchronizer::default().synchronize(&mut buffer, &mut current)?;
    assert_eq!(report.pending, 2);
    assert_eq!(report.reapplied, 1);
    assert_eq!(report.deleted, 0);

    let a = row_by_code(&current, "A").expect("A kept");
    assert_eq!(a.kind(), RowStateKind::Modified);
    assert_eq!(current.value(a.id(), "Qty")?, &Value::Integer(7));
    assert_eq!(a.original_values().unwrap()[0], Value::Integer(1));

    let x = row_by_code(&current, "X").expect("X reapplied");
    assert_eq!(x.kind(), RowStateKind::Added);
    assert_eq!(current.value(x.id(), "Qty")?, &Value::Integer(9));
    assert_eq!(
        row_by_code(&current, "B").unwrap().kind(),
        RowStateKind::Unchanged
    );
    assert_eq!(current.row_count(), 3);
    assert_eq!(buffer.rows(), current.rows());
    Ok(())
}

#[test]
fn test_duplicate_keys_are_reported_without_failing() -> Result<()> {
    let mut buffer = items(&[("A", 1)]);
    let mut current = TableBuilder::new("Item")
        .column("Code", DataType::String)
        .column("Qty", DataType::Integer)
        .key(&["Code"])
        .row(vec!["A".into(), 1.into()])
        .row(vec!["A".into(), 2.into()])
        .committed();

    let report = ChangeBufferSynchronizer::default().synchronize(&mut buffer, &mut current)?;
    assert_eq!(report.pending, 1);
    assert_eq!(report.duplicate_keys.len(), 1);
    let duplicate = &report.duplicate_keys[0];
    assert_eq!(duplicate.side, Side::Right);
    assert_eq!(duplicate.key, vec!["A".to_string()]);
    assert_eq!(duplicate.rows.len(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["duplicate_keys"][0]["key"][0], "A");
    Ok(())
}

#[test]
fn test_large_tables_synchronize_in_one_pass() -> Result<()> {
    let rows: Vec<(String, i64)> = (0..20_000).map(|i| (format!("K{i}"), i)).collect();
    let refs: Vec<(&str, i64)> = rows.iter().map(|(code, qty)| (code.as_str(), *qty)).collect();
    let mut current = items(&refs);
    let mut buffer = current.clone();
    let edited: Vec<_> = buffer.rows().iter().step_by(100).map(Row::id).collect();
    for id in edited {
        buffer.set_value(id, "Qty", -1)?;
    }
    buffer.add_row(vec!["NEW".into(), 0.into()])?;

    let synchronizer = ChangeBufferSynchronizer::default();
    let report = synchronizer.synchronize(&mut buffer, &mut current)?;
    assert_eq!(report.pending, 20_000);
    assert_eq!(report.reapplied, 1);
    assert_eq!(report.absorbed, 20_000);
    assert_eq!(current.rows().iter().filter(|r| r.kind() == RowStateKind::Modified).count(), 200);

    let second = synchronizer.synchronize(&mut buffer, &mut current)?;
    assert_eq!(second.pending, 20_001);
    assert_eq!(buffer.rows(), current.rows());
    Ok(())
}
