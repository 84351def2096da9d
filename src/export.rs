use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::model::Entry;
use crate::view::Filter;

const HEADER: &str = "Date,Project,Hours,Notes";

/// Free text loses every comma and line break so each entry stays on one
/// row of four fields.
fn clean_field(text: &str) -> String {
    text.replace([',', '\n', '\r'], " ")
}

pub fn csv_text(rows: &[&Entry]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for entry in rows {
        out.push_str(&format!(
            "{},{},{:.2},{}\n",
            entry.date,
            clean_field(&entry.project),
            entry.hours,
            clean_field(&entry.notes)
        ));
    }
    out
}

/// Path separators in the project name become `_`, so the file always lands
/// directly in the export directory.
pub fn export_file_name(filter: &Filter) -> String {
    format!("timesheet_{}.csv", filter.as_str().replace(['/', '\\'], "_"))
}

/// Writes the visible rows to `dir` and returns the file path.
pub fn write_csv(dir: &Path, filter: &Filter, rows: &[&Entry]) -> Result<PathBuf> {
    let path = dir.join(export_file_name(filter));
    fs::write(&path, csv_text(rows))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "csv exported");
    Ok(path)
}
