use async_trait::async_trait;

use crate::error::Result;
use crate::model::Document;

/// Opaque revision tag of the remote document (an HTTP entity tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(pub String);

/// A document as read, with the revision it was read at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub document: Document,
    pub version: Option<Version>,
}

/// Storage holding the whole document as a single unit.
///
/// Writes always replace both collections. When `expected` is given the
/// store must refuse the write with [`crate::SyncError::Conflict`] if the
/// remote revision differs.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn read(&self) -> Result<Snapshot>;

    async fn write(&self, document: &Document, expected: Option<&Version>)
        -> Result<Option<Version>>;
}
