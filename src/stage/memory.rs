//! In-memory stage transport
//!
//! A deterministic [`StageTransport`] holding file content in a shared map.
//! Used by the test suites and by offline confirmation flows that want to
//! rehearse a sync without a live remote. Above a configurable size
//! threshold the listing reports composite multi-part hashes, matching how
//! real stages hash files uploaded in parallel chunks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::hash::{hash_bytes, multipart_hash_bytes, MULTIPART_CHUNK_SIZE};
use crate::stage::transport::{RemoteEntry, StageTransport, TransportError};

/// Shared in-memory stage.
///
/// Clones share the same underlying store.
#[derive(Debug, Clone)]
pub struct MemoryStage {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
    multipart_threshold: u64,
    chunk_size: u64,
}

impl MemoryStage {
    /// Stage that always reports simple whole-file hashes.
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(BTreeMap::new())),
            multipart_threshold: u64::MAX,
            chunk_size: MULTIPART_CHUNK_SIZE,
        }
    }

    /// Stage that reports multi-part hashes for files of `threshold` bytes
    /// or more, chunked at `chunk_size`.
    pub fn with_multipart(threshold: u64, chunk_size: u64) -> Self {
        Self {
            files: Arc::new(Mutex::new(BTreeMap::new())),
            multipart_threshold: threshold,
            chunk_size,
        }
    }

    /// Seed remote state directly.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .expect("stage store poisoned")
            .insert(path.into(), content.into());
    }

    /// Content currently stored at `path`, if any.
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files
            .lock()
            .expect("stage store poisoned")
            .get(path)
            .cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files
            .lock()
            .expect("stage store poisoned")
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.lock().expect("stage store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted listing of stored paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .expect("stage store poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for MemoryStage {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTransport for MemoryStage {
    fn list(&self) -> Result<Vec<RemoteEntry>, TransportError> {
        let files = self.files.lock().expect("stage store poisoned");
        Ok(files
            .iter()
            .map(|(path, content)| {
                let size = content.len() as u64;
                let hash = if size >= self.multipart_threshold {
                    multipart_hash_bytes(content, self.chunk_size)
                } else {
                    hash_bytes(content)
                };
                RemoteEntry::new(path.clone(), hash, size)
            })
            .collect())
    }

    fn put(&self, local: &Path, remote: &Path) -> Result<(), TransportError> {
        let content = std::fs::read(local).map_err(|e| {
            TransportError::with_source(format!("cannot read '{}'", local.display()), e)
        })?;
        self.files
            .lock()
            .expect("stage store poisoned")
            .insert(remote.to_path_buf(), content);
        Ok(())
    }

    fn remove(&self, remote: &Path) -> Result<(), TransportError> {
        let removed = self
            .files
            .lock()
            .expect("stage store poisoned")
            .remove(remote);
        if removed.is_none() {
            return Err(TransportError::new(format!(
                "no remote file at '{}'",
                remote.display()
            )));
        }
        Ok(())
    }
}
