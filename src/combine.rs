use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::loader::{read_csv, REQUIRED_COLUMNS, TITLE_COLUMN};
use crate::models::RawTable;

pub const SOURCE_COLUMN: &str = "source_file";

/// Stacks review tables into the canonical column layout, tagging each row
/// with the name of the table it came from. Missing required columns are
/// filled with empty cells; other columns are dropped.
pub fn combine_tables(sources: Vec<(String, RawTable)>) -> RawTable {
    let with_title = sources
        .iter()
        .any(|(_, table)| normalized_index(table, TITLE_COLUMN).is_some());

    let mut columns: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
    if with_title {
        columns.push(TITLE_COLUMN.to_string());
    }
    columns.push(SOURCE_COLUMN.to_string());

    let mut rows = Vec::new();
    for (source, table) in sources {
        let mut wanted: Vec<&str> = REQUIRED_COLUMNS.to_vec();
        if with_title {
            wanted.push(TITLE_COLUMN);
        }

        let indices: Vec<Option<usize>> = wanted
            .iter()
            .map(|name| normalized_index(&table, name))
            .collect();
        for (name, index) in wanted.iter().zip(&indices) {
            if index.is_none() && *name != TITLE_COLUMN {
                warn!("{} has no {} column; filling with empty cells", source, name);
            }
        }

        for row in &table.rows {
            let mut combined: Vec<String> = indices
                .iter()
                .map(|index| index.and_then(|i| row.get(i)).cloned().unwrap_or_default())
                .collect();
            combined.push(source.clone());
            rows.push(combined);
        }
    }

    RawTable::new(columns, rows)
}

pub fn combine_files(paths: &[PathBuf]) -> anyhow::Result<RawTable> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let table = read_csv(path)?;
        info!("Loaded {} reviews from {}", table.len(), path.display());
        sources.push((file_label(path)?, table));
    }
    Ok(combine_tables(sources))
}

fn file_label(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

fn normalized_index(table: &RawTable, name: &str) -> Option<usize> {
    table
        .columns
        .iter()
        .position(|column| column.trim().eq_ignore_ascii_case(name))
}
