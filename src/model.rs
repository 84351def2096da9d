use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::{ALL_PROJECTS, DEFAULT_PROJECT};

/// One logged block of work.
///
/// `id` is the creation time in Unix milliseconds. Entries are never edited,
/// only created and deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(test, derive(fake::Dummy))]
pub struct Entry {
    pub id: i64,
    pub date: NaiveDate,
    pub project: String,
    #[cfg_attr(test, dummy(faker = "0.25..12.0"))]
    pub hours: f64,
    pub notes: String,
}

/// User input for an entry that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub date: Option<NaiveDate>,
    pub project: String,
    pub hours: f64,
    pub notes: String,
}

/// The two collections stored in the remote gist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Newest first.
    pub entries: Vec<Entry>,
    /// Insertion order, no duplicates.
    pub projects: Vec<String>,
}

impl Document {
    /// Builds a document from the raw file contents.
    ///
    /// The entries file is mandatory. Without a projects file the project list
    /// is derived from the entries.
    pub fn from_files(entries: Option<&str>, projects: Option<&str>) -> Result<Document> {
        let entries = entries.ok_or_else(|| {
            SyncError::MalformedDocument(format!("missing file {}", crate::ENTRIES_FILE))
        })?;
        let entries: Vec<Entry> = serde_json::from_str(entries).map_err(|e| {
            SyncError::MalformedDocument(format!("{}: {}", crate::ENTRIES_FILE, e))
        })?;

        let projects = match projects {
            Some(raw) => serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
                SyncError::MalformedDocument(format!("{}: {}", crate::PROJECTS_FILE, e))
            })?,
            None => derive_projects(&entries),
        };

        Ok(Document { entries, projects })
    }

    pub fn entries_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.entries)
            .map_err(|e| SyncError::MalformedDocument(e.to_string()))
    }

    pub fn projects_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.projects)
            .map_err(|e| SyncError::MalformedDocument(e.to_string()))
    }
}

/// Distinct entry projects in first-seen order, or the default project when
/// there are none.
pub fn derive_projects(entries: &[Entry]) -> Vec<String> {
    let seen: IndexSet<&str> = entries
        .iter()
        .map(|e| e.project.as_str())
        .filter(|p| !p.is_empty() && *p != ALL_PROJECTS)
        .collect();

    if seen.is_empty() {
        return vec![DEFAULT_PROJECT.to_string()];
    }
    seen.into_iter().map(String::from).collect()
}
