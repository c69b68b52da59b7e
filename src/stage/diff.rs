//! Stage diff engine
//!
//! Pure comparison of the finished deploy root against a read-only snapshot
//! of the remote listing. Produces the disjoint added/modified/deleted sets
//! the sync executor consumes; files whose hashes match appear in none of
//! them. Remote multi-part hashes are compared by recomputing the chunked
//! digest locally with the same chunk-size convention.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{StagehandError, StagehandResult};
use crate::hash::{RemoteHash, MULTIPART_CHUNK_SIZE};
use crate::stage::transport::RemoteEntry;

/// Knobs for diff computation.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Chunk size used to recompute multi-part hashes. Defaults to the
    /// upload convention; tests shrink it to exercise composite hashes on
    /// small files.
    pub chunk_size: u64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            chunk_size: MULTIPART_CHUNK_SIZE,
        }
    }
}

/// Disjoint change sets between the deploy root and the stage.
///
/// Transient: produced and consumed once per sync. Paths are relative to the
/// deploy root / stage location and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Present locally, absent remotely.
    pub added: Vec<PathBuf>,
    /// Present on both sides with differing content hashes.
    pub modified: Vec<PathBuf>,
    /// Present remotely only; prune candidates.
    pub deleted: Vec<PathBuf>,
}

impl DiffResult {
    /// Whether any upload or removal would happen.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.deleted.is_empty()
    }

    /// Paths that will be uploaded, in sorted order.
    pub fn uploads(&self) -> impl Iterator<Item = &PathBuf> {
        self.added.iter().chain(self.modified.iter())
    }
}

/// Compare the deploy root tree against a remote listing snapshot.
pub fn diff_deploy_root(
    deploy_root: &Path,
    remote: &[RemoteEntry],
    options: &DiffOptions,
) -> StagehandResult<DiffResult> {
    let local = collect_local_files(deploy_root)?;
    let remote_by_path: BTreeMap<&Path, &RemoteEntry> =
        remote.iter().map(|e| (e.path.as_path(), e)).collect();

    let mut diff = DiffResult::default();

    for rel in &local {
        match remote_by_path.get(rel.as_path()) {
            None => diff.added.push(rel.clone()),
            Some(entry) => {
                let absolute = deploy_root.join(rel);
                let matches = RemoteHash::parse(&entry.hash)
                    .matches_file(&absolute, options.chunk_size)
                    .map_err(StagehandError::Io)?;
                if !matches {
                    diff.modified.push(rel.clone());
                }
            }
        }
    }

    for entry in remote {
        if !local.contains(&entry.path) {
            diff.deleted.push(entry.path.clone());
        }
    }
    diff.deleted.sort();
    diff.deleted.dedup();

    tracing::debug!(
        added = diff.added.len(),
        modified = diff.modified.len(),
        deleted = diff.deleted.len(),
        "computed stage diff"
    );
    Ok(diff)
}

/// Walk the deploy root and return the sorted set of file paths relative to
/// it. Symlinked files count as files; directories do not appear.
fn collect_local_files(deploy_root: &Path) -> StagehandResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = ignore::WalkBuilder::new(deploy_root)
        .standard_filters(false)
        .follow_links(false)
        .build();
    for entry in walker {
        let entry = entry.map_err(|e| StagehandError::Io(std::io::Error::other(e)))?;
        if entry.depth() == 0 {
            continue;
        }
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if is_dir {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(deploy_root)
            .expect("walk entries live under their root")
            .to_path_buf();
        files.push(rel);
    }
    files.sort();
    Ok(files)
}
