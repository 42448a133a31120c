//! Command implementations for tablesync CLI

use crate::cli::{Commands, ConfigCommand};
use crate::output::{JsonFormatter, KeyEntry, PrettyPrinter};
use std::collections::HashMap;
use std::path::Path;
use tablesync_core::config::{self, Config};
use tablesync_core::error::{Result, TablesyncError};
use tablesync_core::{check_datasets, load_dataset, save_dataset, DataSetMerger, KeyCodec};

/// Execute a command
pub fn execute_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Merge {
            original,
            changed,
            output,
            json,
        } => merge_command(config_path, &original, &changed, output.as_deref(), json),
        Commands::Sync {
            buffer,
            current,
            write,
            json,
        } => sync_command(config_path, &buffer, &current, write, json),
        Commands::Check { left, right, json } => check_command(&left, &right, json),
        Commands::Keys { file, table, json } => keys_command(&file, &table, json),
        Commands::Config { command } => config_command(config_path, &command),
    }
}

fn merge_command(
    config_path: Option<&Path>,
    original: &Path,
    changed: &Path,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = config::get_config_from(config_path)?;
    let original_set = load_dataset(original)?;
    let changed_set = load_dataset(changed)?;
    log::debug!(
        "Merging {} ({} tables) with {} ({} tables)",
        original.display(),
        original_set.len(),
        changed.display(),
        changed_set.len()
    );

    let merged = DataSetMerger::new(config.merge.to_options()).merge(&original_set, &changed_set)?;

    if let Some(output) = output {
        save_dataset(output, &merged.dataset)?;
        log::info!("Merged dataset written to {}", output.display());
    }

    if json {
        println!("{}", JsonFormatter::format_merge_reports(&merged.reports)?);
    } else {
        PrettyPrinter::print_merge_reports(&merged.reports, &merged.dataset, config.output.sample_rows);
        if let Some(output) = output {
            println!("💾 Saved merged dataset to {}", output.display());
        }
    }
    Ok(())
}

fn sync_command(
    config_path: Option<&Path>,
    buffer: &Path,
    current: &Path,
    write: bool,
    json: bool,
) -> Result<()> {
    let config = config::get_config_from(config_path)?;
    let mut buffer_set = load_dataset(buffer)?;
    let mut current_set = load_dataset(current)?;

    let reports = DataSetMerger::new(config.merge.to_options())
        .synchronize(&mut buffer_set, &mut current_set)?;

    if write {
        save_dataset(buffer, &buffer_set)?;
        save_dataset(current, &current_set)?;
        log::info!(
            "Wrote synchronized documents {} and {}",
            buffer.display(),
            current.display()
        );
    }

    if json {
        println!("{}", JsonFormatter::format_sync_reports(&reports)?);
    } else {
        PrettyPrinter::print_sync_reports(&reports);
        if !write {
            println!("(dry run: pass --write to save both documents)");
        }
    }
    Ok(())
}

fn check_command(left: &Path, right: &Path, json: bool) -> Result<()> {
    let left_set = load_dataset(left)?;
    let right_set = load_dataset(right)?;
    let mismatches = check_datasets(&left_set, &right_set);

    if json {
        println!("{}", JsonFormatter::format_schema_check(&mismatches)?);
    } else {
        PrettyPrinter::print_schema_check(&mismatches);
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(TablesyncError::invalid_input(format!(
            "{} and {} are not merge-compatible ({} problem(s))",
            left.display(),
            right.display(),
            mismatches.len()
        )))
    }
}

fn keys_command(file: &Path, table_name: &str, json: bool) -> Result<()> {
    let dataset = load_dataset(file)?;
    let table = dataset.table(table_name).ok_or_else(|| {
        TablesyncError::invalid_input(format!(
            "Table '{}' not found in {}",
            table_name,
            file.display()
        ))
    })?;
    if !table.has_primary_key() {
        return Err(TablesyncError::MissingPrimaryKey {
            table: table.name().to_string(),
        });
    }

    let entries = key_entries(table);
    if json {
        println!("{}", JsonFormatter::format_keys(table, &entries)?);
    } else {
        PrettyPrinter::print_keys(table, &entries);
    }
    Ok(())
}

/// Key of every row; live rows sharing a key are flagged
fn key_entries(table: &tablesync_core::Table) -> Vec<KeyEntry> {
    let codec = KeyCodec::for_table(table);
    let keys: Vec<_> = table.rows().iter().map(|row| codec.encode(row)).collect();

    let mut live_counts: HashMap<&str, usize> = HashMap::new();
    for (row, key) in table.rows().iter().zip(&keys) {
        if row.is_live() {
            *live_counts.entry(key.as_str()).or_default() += 1;
        }
    }

    table
        .rows()
        .iter()
        .zip(&keys)
        .map(|(row, key)| KeyEntry {
            row: row.id(),
            state: row.kind(),
            key: key.fields(),
            duplicate: row.is_live() && live_counts.get(key.as_str()).copied().unwrap_or(0) > 1,
        })
        .collect()
}

fn config_command(config_path: Option<&Path>, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = config::get_config_from(config_path)?;
            PrettyPrinter::print_config(&config);
            Ok(())
        }
        ConfigCommand::Init { force } => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(config::global_config_path);
            init_config_at(&path, *force)?;
            println!("✅ Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(TablesyncError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    config::save_config_to(&Config::default(), path)?;
    Ok(())
}
