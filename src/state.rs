use crate::error::Rejection;
use crate::model::{Document, Entry};
use crate::store::{Snapshot, Version};
use crate::ALL_PROJECTS;

/// In-memory mirror of the remote document.
///
/// Every render reads from here. It is replaced wholesale on each successful
/// read and mutated in place before each write.
#[derive(Debug, Clone, Default)]
pub struct LocalState {
    document: Document,
    version: Option<Version>,
    loaded: bool,
}

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.document.entries
    }

    pub fn projects(&self) -> &[String] {
        &self.document.projects
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Whether the state has been filled from the remote store at least once.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn replace(&mut self, snapshot: Snapshot) {
        self.document = snapshot.document;
        self.version = snapshot.version;
        self.loaded = true;
    }

    pub fn set_version(&mut self, version: Option<Version>) {
        self.version = version;
    }

    /// New entries go to the front.
    pub fn prepend(&mut self, entry: Entry) {
        self.document.entries.insert(0, entry);
    }

    pub fn remove_entry(&mut self, id: i64) -> bool {
        let before = self.document.entries.len();
        self.document.entries.retain(|e| e.id != id);
        self.document.entries.len() != before
    }

    pub fn add_project(&mut self, name: &str) -> Result<(), Rejection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Rejection::EmptyProjectName);
        }
        if name == ALL_PROJECTS {
            return Err(Rejection::SentinelProject(name.to_string()));
        }
        if self.has_project(name) {
            return Err(Rejection::DuplicateProject(name.to_string()));
        }
        self.document.projects.push(name.to_string());
        Ok(())
    }

    /// Entries that reference the project are left alone.
    pub fn remove_project(&mut self, name: &str) -> bool {
        let before = self.document.projects.len();
        self.document.projects.retain(|p| p != name.trim());
        self.document.projects.len() != before
    }

    pub fn has_project(&self, name: &str) -> bool {
        self.document.projects.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: i64, project: &str) -> Entry {
        Entry {
            id,
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            project: project.to_string(),
            hours: 1.0,
            notes: String::new(),
        }
    }

    #[test]
    fn test_prepend_keeps_newest_first() {
        let mut state = LocalState::new();
        state.prepend(entry(1, "A"));
        state.prepend(entry(2, "A"));

        let ids: Vec<i64> = state.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_remove_unknown_entry() {
        let mut state = LocalState::new();
        state.prepend(entry(1, "A"));

        assert!(!state.remove_entry(42));
        assert_eq!(state.entries().len(), 1);
        assert!(state.remove_entry(1));
        assert!(state.entries().is_empty());
    }

    #[test]
    fn test_project_set_semantics() {
        let mut state = LocalState::new();
        state.add_project("Beta").unwrap();
        state.add_project("  Alpha ").unwrap();

        assert_eq!(
            state.add_project("Beta"),
            Err(Rejection::DuplicateProject("Beta".to_string()))
        );
        assert_eq!(state.add_project("   "), Err(Rejection::EmptyProjectName));
        assert_eq!(state.projects(), &["Beta".to_string(), "Alpha".to_string()]);
    }

    #[test]
    fn test_filter_sentinel_is_not_a_project() {
        let mut state = LocalState::new();
        state.add_project("General").unwrap();

        assert_eq!(
            state.add_project(" all "),
            Err(Rejection::SentinelProject("all".to_string()))
        );
        assert_eq!(state.projects(), &["General".to_string()]);
    }

    #[test]
    fn test_remove_project_keeps_entries() {
        let mut state = LocalState::new();
        state.add_project("Beta").unwrap();
        state.prepend(entry(1, "Beta"));

        assert!(state.remove_project("Beta"));
        assert!(!state.remove_project("Beta"));
        assert!(state.projects().is_empty());
        assert_eq!(state.entries()[0].project, "Beta");
    }
}
