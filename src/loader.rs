use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::RawTable;

pub const REQUIRED_COLUMNS: [&str; 3] = ["date", "rating", "review_text"];
pub const TITLE_COLUMN: &str = "review_title";

/// Required columns absent from `columns`, in canonical order.
pub fn missing_columns(columns: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !columns.iter().any(|column| column == *required))
        .map(|required| required.to_string())
        .collect()
}

/// Validates the raw schema and passes the table through untouched.
/// Column names must already be canonical; no case folding happens here.
pub fn load(table: RawTable) -> Result<RawTable> {
    let missing = missing_columns(&table.columns);
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    info!("Loaded {} raw reviews", table.len());
    Ok(table)
}

pub fn read_csv(path: &Path) -> anyhow::Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open review CSV {}", path.display()))?;

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read header row of {}", path.display()))?
        .iter()
        .map(|header| header.to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("malformed CSV record {} in {}", index + 1, path.display()))?;
        let mut row: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
        row.resize(columns.len(), String::new());
        rows.push(row);
    }

    debug!("Read {} rows with columns {:?} from {}", rows.len(), columns, path.display());
    Ok(RawTable::new(columns, rows))
}

pub fn write_csv(path: &Path, table: &RawTable) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
