use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde_json::Value;

use crate::data::Row;
use crate::schema::ColumnDescriptor;

/// Timestamped download name matching the web client's export naming.
pub fn export_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.csv", prefix, now.timestamp_millis())
}

/// Renders rows to CSV: one header row of column labels, then one line per
/// row with cells looked up by field name.
pub fn csv_string(columns: &[ColumnDescriptor], rows: &[Row]) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(columns.iter().map(|column| column.label.as_str()))
        .context("write csv header")?;
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| cell_text(row.get(&column.field_name)))
            .collect();
        writer.write_record(&record).context("write csv row")?;
    }
    let bytes = writer.into_inner().context("flush csv buffer")?;
    String::from_utf8(bytes).context("csv output utf8")
}

/// Display text for one cell. Absent and null values render empty; other
/// scalars render bare, without JSON quoting.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Writes an already-rendered CSV payload into `dir` under a timestamped
/// name and returns the full path.
pub fn save_export(dir: &Path, prefix: &str, payload: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create export directory {}", dir.display()))?;
    let path = dir.join(export_filename(prefix, Utc::now()));
    fs::write(&path, payload)
        .with_context(|| format!("write export file {}", path.display()))?;
    Ok(path)
}
