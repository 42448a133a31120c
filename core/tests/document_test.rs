mod common;

use common::{items, TestWorkspace};
use tablesync_core::config::{load_config_file, save_config_to, Config};
use tablesync_core::{
    load_dataset, DataSet, DataSetMerger, DuplicateKeyPolicy, Result, RowStateKind,
    SchemaMismatchPolicy, TablesyncError,
};

#[test]
fn test_merged_dataset_survives_save_and_load() -> Result<()> {
    let workspace = TestWorkspace::new();
    let original: DataSet = vec![items(&[("A", 10), ("B", 20)])].into_iter().collect();
    let changed: DataSet = vec![items(&[("A", 15), ("C", 30)])].into_iter().collect();

    let merged = DataSetMerger::default().merge(&original, &changed)?;
    let path = workspace.save("merged.json", &merged.dataset);
    let reloaded = load_dataset(&path)?;

    assert_eq!(reloaded, merged.dataset);
    let states: Vec<RowStateKind> = reloaded
        .table("Item")
        .unwrap()
        .rows()
        .iter()
        .map(|row| row.kind())
        .collect();
    assert_eq!(
        states,
        vec![RowStateKind::Modified, RowStateKind::Deleted, RowStateKind::Added]
    );
    Ok(())
}

#[test]
fn test_hand_written_document_loads() -> Result<()> {
    let workspace = TestWorkspace::new();
    let path = workspace.write_file(
        "buffer.json",
        r#"{
  "tables": [
    {
      "name": "Item",
      "columns": [
        {"name": "Code", "type": "string"},
        {"name": "Qty", "type": "integer"}
      ],
      "primary_key": ["Code"],
      "rows": [
        {"state": "modified", "values": {"Code": "A", "Qty": 15}, "original": {"Code": "A", "Qty": 10}},
        {"state": "deleted", "values": {"Code": "B", "Qty": 20}},
        {"state": "added", "values": {"Code": "X", "Qty": null}}
      ]
    }
  ]
}"#,
    );

    let dataset = load_dataset(&path)?;
    let table = dataset.table("Item").unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.rows()[0].original_values().unwrap()[1].to_string(), "10");
    assert!(table.rows()[1].is_deleted());
    assert!(table.rows()[2].value_at(1).is_null());
    Ok(())
}

#[test]
fn test_missing_or_broken_files_are_errors() {
    let workspace = TestWorkspace::new();
    assert!(matches!(
        load_dataset(&workspace.path().join("absent.json")),
        Err(TablesyncError::Io(_))
    ));

    let broken = workspace.write_file("broken.json", "{ not json");
    assert!(matches!(
        load_dataset(&broken),
        Err(TablesyncError::DataProcessing { .. })
    ));
}

#[test]
fn test_config_file_round_trip() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_file(
        "tablesync.toml",
        "[merge]\nduplicate_keys = \"reject\"\n\n[output]\nsample_rows = 5\n",
    );

    let config = load_config_file(&path).unwrap();
    assert_eq!(config.merge.duplicate_keys, DuplicateKeyPolicy::Reject);
    assert_eq!(config.merge.schema_mismatch, SchemaMismatchPolicy::Skip);
    assert_eq!(config.output.sample_rows, 5);

    let copy = workspace.path().join("copy.toml");
    save_config_to(&config, &copy).unwrap();
    assert_eq!(load_config_file(&copy).unwrap(), config);
    assert_ne!(config, Config::default());
}
