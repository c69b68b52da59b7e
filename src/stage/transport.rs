//! Stage transport boundary
//!
//! The engine never speaks to the remote store directly; an external
//! collaborator supplies the three primitives below. Transport errors cross
//! this boundary unchanged; the engine neither generates nor retries them.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error raised by a [`StageTransport`] implementation.
///
/// Carries the collaborator's message and, when available, its underlying
/// error as the source.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// One file in the remote store's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Path relative to the stage location.
    pub path: PathBuf,
    /// Content hash: plain hex, or composite `<hex>-<parts>`.
    pub hash: String,
    /// Size in bytes.
    pub size: u64,
}

impl RemoteEntry {
    pub fn new(path: impl Into<PathBuf>, hash: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
            size,
        }
    }
}

/// Remote store primitives consumed by the diff and sync stages.
///
/// Implementations are bound to one stage location. `Send + Sync` because
/// uploads and removals fan out per file.
pub trait StageTransport: Send + Sync {
    /// Snapshot the remote listing with per-file content hashes.
    fn list(&self) -> Result<Vec<RemoteEntry>, TransportError>;

    /// Upload a whole local file to a relative remote path.
    fn put(&self, local: &Path, remote: &Path) -> Result<(), TransportError>;

    /// Remove a file at a relative remote path.
    fn remove(&self, remote: &Path) -> Result<(), TransportError>;
}
