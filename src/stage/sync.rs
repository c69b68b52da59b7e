//! Sync executor
//!
//! Applies a [`DiffResult`] to the stage through the transport primitives:
//! uploads every added or modified file, and removes remote-only files when
//! pruning. Uploads and removals fan out per file; the first transport error
//! aborts the run (retries belong to the transport collaborator).

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::StagehandResult;
use crate::stage::diff::DiffResult;
use crate::stage::transport::StageTransport;

/// What a sync run did (or, for kept remote files, did not) touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Files uploaded, sorted.
    pub uploaded: Vec<PathBuf>,
    /// Remote files removed (pruning only), sorted.
    pub removed: Vec<PathBuf>,
    /// Remote-only files left in place because pruning was off, sorted.
    pub kept_remote: Vec<PathBuf>,
}

impl SyncOutcome {
    /// Whether the run mutated the stage at all.
    pub fn is_noop(&self) -> bool {
        self.uploaded.is_empty() && self.removed.is_empty()
    }
}

/// Executes a diff against one stage location.
pub struct SyncExecutor<'a, T: StageTransport + ?Sized> {
    transport: &'a T,
    prune: bool,
}

impl<'a, T: StageTransport + ?Sized> SyncExecutor<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            prune: false,
        }
    }

    /// Also remove remote files with no local counterpart.
    pub fn prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Human-readable summary of what `execute` would do, for confirmation
    /// flows. Deterministic; performs no I/O and mutates nothing.
    pub fn preview(&self, diff: &DiffResult) -> String {
        if !diff.has_changes() {
            return "stage is up to date".to_string();
        }
        let mut lines = Vec::new();
        for path in &diff.added {
            lines.push(format!("  + {} (upload)", path.display()));
        }
        for path in &diff.modified {
            lines.push(format!("  ~ {} (upload, changed)", path.display()));
        }
        for path in &diff.deleted {
            if self.prune {
                lines.push(format!("  - {} (remove)", path.display()));
            } else {
                lines.push(format!("  ? {} (remote only, kept)", path.display()));
            }
        }
        lines.join("\n")
    }

    /// Upload and (when pruning) remove per the diff. Local files are read
    /// from `deploy_root`.
    pub fn execute(&self, deploy_root: &Path, diff: &DiffResult) -> StagehandResult<SyncOutcome> {
        let uploads: Vec<&PathBuf> = diff.uploads().collect();
        uploads.par_iter().try_for_each(|rel| {
            tracing::debug!(path = %rel.display(), "uploading");
            self.transport.put(&deploy_root.join(rel), rel)
        })?;

        let mut outcome = SyncOutcome {
            uploaded: uploads.into_iter().cloned().collect(),
            ..SyncOutcome::default()
        };
        outcome.uploaded.sort();

        if self.prune {
            diff.deleted.par_iter().try_for_each(|rel| {
                tracing::debug!(path = %rel.display(), "removing remote file");
                self.transport.remove(rel)
            })?;
            outcome.removed = diff.deleted.clone();
        } else {
            outcome.kept_remote = diff.deleted.clone();
        }

        tracing::info!(
            uploaded = outcome.uploaded.len(),
            removed = outcome.removed.len(),
            kept_remote = outcome.kept_remote.len(),
            "stage sync complete"
        );
        Ok(outcome)
    }
}
