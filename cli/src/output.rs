//! Output formatting utilities

use serde::Serialize;
use tablesync_core::config::Config;
use tablesync_core::error::Result;
use tablesync_core::merge::SkipReason;
use tablesync_core::schema::Side;
use tablesync_core::{
    DataSet, KeyCodec, MergeReport, RowStateKind, SchemaMismatch, SyncReport, Table,
};

/// One row of the `keys` listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyEntry {
    pub row: u64,
    pub state: RowStateKind,
    pub key: Vec<String>,
    pub duplicate: bool,
}

/// Pretty printer for tablesync output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print per-table merge results with a few sample keys per state
    pub fn print_merge_reports(reports: &[MergeReport], merged: &DataSet, sample_rows: usize) {
        if reports.is_empty() {
            println!("No tables in common; nothing merged.");
            return;
        }

        println!("🔀 Merge Results");
        for (i, report) in reports.iter().enumerate() {
            let last = i == reports.len() - 1;
            let (branch, indent) = if last { ("└─", "   ") } else { ("├─", "│  ") };

            if let Some(reason) = report.skipped {
                println!("{branch} ⚠️  {}: skipped ({})", report.table, describe_skip(reason));
                Self::print_mismatches(&report.schema_mismatches, indent);
                continue;
            }

            let changes = &report.changes;
            let marker = if changes.has_changes() { "❌" } else { "✅" };
            println!("{branch} {marker} {}: {} rows", report.table, changes.total());
            println!("{indent}├─ Unchanged: {}", changes.unchanged);
            println!("{indent}├─ Modified: {}", changes.modified);
            if let Some(table) = merged.table(&report.table) {
                print_samples(table, RowStateKind::Modified, sample_rows, &format!("{indent}│  "));
            }
            println!("{indent}├─ Deleted: {}", changes.deleted);
            if let Some(table) = merged.table(&report.table) {
                print_samples(table, RowStateKind::Deleted, sample_rows, &format!("{indent}│  "));
            }
            let tail = if report.duplicate_keys.is_empty() { "└─" } else { "├─" };
            println!("{indent}{tail} Added: {}", changes.added);
            if let Some(table) = merged.table(&report.table) {
                let pad = if report.duplicate_keys.is_empty() { "   " } else { "│  " };
                print_samples(table, RowStateKind::Added, sample_rows, &format!("{indent}{pad}"));
            }

            if !report.duplicate_keys.is_empty() {
                println!(
                    "{indent}└─ ⚠️  Duplicate keys: {}",
                    report.duplicate_keys.len()
                );
                for duplicate in report.duplicate_keys.iter().take(sample_rows) {
                    println!(
                        "{indent}   └─ [{}] on {} side, {} rows",
                        duplicate.key.join(", "),
                        duplicate.side,
                        duplicate.rows.len()
                    );
                }
            }
        }
    }

    /// Print per-table synchronization results
    pub fn print_sync_reports(reports: &[SyncReport]) {
        if reports.is_empty() {
            println!("No tables in common; nothing synchronized.");
            return;
        }

        println!("🔄 Synchronization Results");
        for (i, report) in reports.iter().enumerate() {
            let last = i == reports.len() - 1;
            let (branch, indent) = if last { ("└─", "   ") } else { ("├─", "│  ") };
            println!("{branch} {}", report.table);
            println!("{indent}├─ Pending: {}", report.pending);
            println!("{indent}├─ Reapplied: {}", report.reapplied);
            println!("{indent}├─ Finalized: {}", report.finalized);
            println!("{indent}├─ Deleted in current: {}", report.deleted);
            if report.columns_added > 0 {
                println!("{indent}├─ Columns added: {}", report.columns_added);
            }
            if report.duplicate_keys.is_empty() {
                println!("{indent}└─ Absorbed: {}", report.absorbed);
                continue;
            }
            println!("{indent}├─ Absorbed: {}", report.absorbed);
            println!(
                "{indent}└─ ⚠️  Duplicate keys: {}",
                report.duplicate_keys.len()
            );
            for duplicate in &report.duplicate_keys {
                let side = if duplicate.side == Side::Left { "buffer" } else { "current" };
                println!(
                    "{indent}   └─ [{}] in {side}, {} rows",
                    duplicate.key.join(", "),
                    duplicate.rows.len()
                );
            }
        }
    }

    /// Print a schema compatibility report
    pub fn print_schema_check(mismatches: &[SchemaMismatch]) {
        if mismatches.is_empty() {
            println!("✅ Schemas are compatible");
            return;
        }
        println!("❌ Schemas are incompatible: {} problem(s)", mismatches.len());
        Self::print_mismatches(mismatches, "");
    }

    fn print_mismatches(mismatches: &[SchemaMismatch], prefix: &str) {
        for (i, mismatch) in mismatches.iter().enumerate() {
            let branch = if i == mismatches.len() - 1 { "└─" } else { "├─" };
            println!("{prefix}{branch} {mismatch}");
        }
    }

    /// Print the compound keys of a table's rows
    pub fn print_keys(table: &Table, entries: &[KeyEntry]) {
        println!(
            "🔑 {} (key: {})",
            table.name(),
            table.primary_key().join(", ")
        );
        if entries.is_empty() {
            println!("└─ No rows.");
            return;
        }
        for (i, entry) in entries.iter().enumerate() {
            let branch = if i == entries.len() - 1 { "└─" } else { "├─" };
            let flag = if entry.duplicate { " ⚠️  duplicate" } else { "" };
            println!(
                "{branch} Row {} [{}]: {}{flag}",
                entry.row,
                entry.state,
                entry.key.join(", ")
            );
        }
    }

    /// Print the resolved configuration
    pub fn print_config(config: &Config) {
        println!("Current merge configuration:");
        println!("  Duplicate keys: {:?}", config.merge.duplicate_keys);
        println!("  Schema mismatch: {:?}", config.merge.schema_mismatch);
        println!("Current output configuration:");
        println!("  Sample rows: {}", config.output.sample_rows);
    }
}

fn describe_skip(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::MissingPrimaryKey => "table has no primary key",
        SkipReason::SchemaMismatch => "schemas differ",
    }
}

/// List up to `limit` keys of rows in `state`
fn print_samples(table: &Table, state: RowStateKind, limit: usize, prefix: &str) {
    if limit == 0 {
        return;
    }
    let codec = KeyCodec::for_table(table);
    let rows: Vec<_> = table.rows().iter().filter(|r| r.kind() == state).collect();
    if rows.is_empty() {
        return;
    }
    let sample: Vec<String> = rows
        .iter()
        .take(limit)
        .map(|row| format!("[{}]", codec.encode(row).fields().join(", ")))
        .collect();
    let more = if rows.len() > limit { "..." } else { "" };
    println!("{prefix}└─ Keys: {}{more}", sample.join(" "));
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format_merge_reports(reports: &[MergeReport]) -> Result<String> {
        Self::format(&serde_json::json!({ "tables": reports }))
    }

    pub fn format_sync_reports(reports: &[SyncReport]) -> Result<String> {
        Self::format(&serde_json::json!({ "tables": reports }))
    }

    pub fn format_schema_check(mismatches: &[SchemaMismatch]) -> Result<String> {
        Self::format(&serde_json::json!({
            "compatible": mismatches.is_empty(),
            "mismatches": mismatches,
        }))
    }

    pub fn format_keys(table: &Table, entries: &[KeyEntry]) -> Result<String> {
        Self::format(&serde_json::json!({
            "table": table.name(),
            "primary_key": table.primary_key(),
            "rows": entries,
        }))
    }

    fn format<T: Serialize>(value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }
}
