//! Sequencing of remote reads and writes around local mutations.
//!
//! Every mutation follows the same steps: (optionally) read the remote
//! document into the local state, mutate the local state, write the whole
//! document back. Two clients mutating the same document can still race
//! between one client's read and its write. The store's version check turns
//! that race into a [`crate::SyncError::Conflict`] where the service supports it;
//! otherwise the last writer wins.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::clock::{Clock, DefaultClock};
use crate::error::{Rejection, Result};
use crate::model::{Entry, NewEntry};
use crate::state::LocalState;
use crate::store::RemoteStore;
use crate::ALL_PROJECTS;

/// When to re-read the remote document before an entry mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Re-read before every entry add or delete. Picks up other clients'
    /// changes at the cost of a round trip and of any unsaved local edits.
    #[default]
    ReadBeforeWrite,
    /// Write the local state as it is.
    TrustLocal,
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read-before-write" | "read" => Ok(SyncPolicy::ReadBeforeWrite),
            "trust-local" | "local" => Ok(SyncPolicy::TrustLocal),
            other => Err(format!("unknown sync policy '{}'", other)),
        }
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPolicy::ReadBeforeWrite => write!(f, "read-before-write"),
            SyncPolicy::TrustLocal => write!(f, "trust-local"),
        }
    }
}

/// Owns the local state and keeps it in step with a [`RemoteStore`].
pub struct SyncController<S> {
    store: S,
    policy: SyncPolicy,
    state: LocalState,
    clock: Arc<dyn Clock>,
}

impl<S: RemoteStore> SyncController<S> {
    pub fn new(store: S, policy: SyncPolicy) -> Self {
        Self::with_clock(store, policy, Arc::new(DefaultClock))
    }

    pub fn with_clock(store: S, policy: SyncPolicy, clock: Arc<dyn Clock>) -> Self {
        SyncController {
            store,
            policy,
            state: LocalState::new(),
            clock,
        }
    }

    pub fn state(&self) -> &LocalState {
        &self.state
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Replaces the local state with the remote document. On failure the
    /// local state is left as it was.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<()> {
        let snapshot = self.store.read().await?;
        self.state.replace(snapshot);
        Ok(())
    }

    async fn ensure_loaded(&mut self) -> Result<()> {
        if self.state.is_loaded() {
            return Ok(());
        }
        self.refresh().await
    }

    async fn prepare_entry_mutation(&mut self) -> Result<()> {
        match self.policy {
            SyncPolicy::ReadBeforeWrite => self.refresh().await,
            SyncPolicy::TrustLocal => self.ensure_loaded().await,
        }
    }

    async fn persist(&mut self) -> Result<()> {
        let version = self
            .store
            .write(self.state.document(), self.state.version())
            .await?;
        self.state.set_version(version);
        Ok(())
    }

    #[instrument(skip(self, new_entry), fields(project = %new_entry.project))]
    pub async fn add_entry(&mut self, new_entry: NewEntry) -> Result<Entry> {
        let date = validate_entry(&new_entry)?;
        self.prepare_entry_mutation().await?;

        let entry = Entry {
            id: self.clock.time().timestamp_millis(),
            date,
            project: new_entry.project.trim().to_string(),
            hours: new_entry.hours,
            notes: new_entry.notes,
        };
        self.state.prepend(entry.clone());
        self.persist().await?;

        info!(id = entry.id, hours = entry.hours, "entry added");
        Ok(entry)
    }

    /// Removes an entry. An unknown id still writes the document back and
    /// reports `false`.
    #[instrument(skip(self))]
    pub async fn delete_entry(&mut self, id: i64) -> Result<bool> {
        self.prepare_entry_mutation().await?;

        let removed = self.state.remove_entry(id);
        self.persist().await?;

        info!(removed, "entry delete");
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn add_project(&mut self, name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Rejection::EmptyProjectName.into());
        }
        if trimmed == ALL_PROJECTS {
            return Err(Rejection::SentinelProject(trimmed.to_string()).into());
        }
        self.ensure_loaded().await?;

        self.state.add_project(name)?;
        self.persist().await?;

        info!("project added");
        Ok(())
    }

    /// Entries referencing the project keep it.
    #[instrument(skip(self))]
    pub async fn remove_project(&mut self, name: &str) -> Result<bool> {
        self.ensure_loaded().await?;

        let removed = self.state.remove_project(name);
        self.persist().await?;

        info!(removed, "project remove");
        Ok(removed)
    }
}

fn validate_entry(new_entry: &NewEntry) -> Result<chrono::NaiveDate> {
    let date = new_entry.date.ok_or(Rejection::MissingDate)?;
    if !(new_entry.hours.is_finite() && new_entry.hours > 0.0) {
        return Err(Rejection::NonPositiveHours.into());
    }
    let project = new_entry.project.trim();
    if project.is_empty() {
        return Err(Rejection::MissingProject.into());
    }
    if project == ALL_PROJECTS {
        return Err(Rejection::SentinelProject(project.to_string()).into());
    }
    Ok(date)
}
