//! Error types for sync operations

use thiserror::Error;

/// Sync error
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport failure or non-success status from the remote store
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Retrieved content did not have the expected shape
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Operation refused before contacting the remote store
    #[error("Rejected: {0}")]
    ValidationRejected(#[from] Rejection),

    /// Remote document changed since it was last read
    #[error(
        "Remote document changed since it was last read; refresh and retry \
         (if this repeats, the server may not honor If-Match: set conditional_writes to \"false\")"
    )]
    Conflict,
}

/// Why a mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("date is required")]
    MissingDate,

    #[error("hours must be a positive number")]
    NonPositiveHours,

    #[error("a project is required")]
    MissingProject,

    #[error("'{0}' is not a project")]
    SentinelProject(String),

    #[error("project name is empty")]
    EmptyProjectName,

    #[error("project '{0}' already exists")]
    DuplicateProject(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => SyncError::RemoteUnavailable(format!("status {}", status)),
            None => SyncError::RemoteUnavailable(e.to_string()),
        }
    }
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
