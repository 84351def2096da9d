//! Time tracking against a single remote gist document.
//!
//! Entries and projects live in two files of one gist. A [`SyncController`]
//! owns the in-memory copy, applies mutations and writes the whole document
//! back, optionally re-reading it first (see [`SyncPolicy`]).

#[macro_use]
extern crate prettytable;

pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod gist;
pub mod model;
pub mod state;
pub mod stopwatch;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod view;

pub use error::{Rejection, Result, SyncError};
pub use gist::{GistConfig, GistStore};
pub use model::{Document, Entry, NewEntry};
pub use store::{RemoteStore, Snapshot, Version};
pub use sync::{SyncController, SyncPolicy};
pub use view::Filter;

/// Filter value meaning "every project". Never a valid entry project.
pub const ALL_PROJECTS: &str = "all";

/// Project used when the document has neither a project list nor entries.
pub const DEFAULT_PROJECT: &str = "General";

/// Gist file holding the entry sequence.
pub const ENTRIES_FILE: &str = "data.json";

/// Gist file holding the project sequence.
pub const PROJECTS_FILE: &str = "projects.json";
