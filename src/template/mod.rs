//! Template processor
//!
//! Rewrites eligible materialized files in place. Files without recognized
//! expressions keep their symlink (the cheap path); files with expressions
//! are rendered against the read-only context, the symlink is dropped, and
//! the rendered text lands as a plain file at the same destination via an
//! atomic tempfile + rename. Failures are file-scoped: every file is
//! attempted, every failure reported, and no file is ever partially written.

mod render;
mod syntax;

use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;

use crate::error::{StagehandError, StagehandResult};

pub use syntax::{detect, SyntaxKind};

/// One file-scoped template failure.
#[derive(Debug)]
pub struct TemplateFailure {
    /// File that failed, left exactly as materialized.
    pub file: PathBuf,
    pub error: StagehandError,
}

/// Aggregate outcome of processing a set of template units.
#[derive(Debug, Default)]
pub struct TemplateReport {
    /// Files rewritten as plain rendered files, sorted.
    pub rendered: Vec<PathBuf>,
    /// Files left as their original symlink (no expressions), sorted.
    pub untouched: Vec<PathBuf>,
    /// File-scoped failures.
    pub failures: Vec<TemplateFailure>,
}

impl TemplateReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert into a hard error carrying the first failure, for callers
    /// that do not inspect per-file results.
    pub fn into_result(self) -> StagehandResult<Self> {
        if let Some(first) = self.failures.into_iter().next() {
            return Err(first.error);
        }
        Ok(Self {
            rendered: self.rendered,
            untouched: self.untouched,
            failures: Vec::new(),
        })
    }
}

/// Process every file in `units` against `context`.
///
/// Rendering is pure and file-local, so units fan out across a worker pool;
/// source/destination pairs are disjoint per file and need no extra
/// synchronization.
pub fn render_units(units: &[PathBuf], context: &Value) -> TemplateReport {
    let results: Vec<(PathBuf, StagehandResult<FileOutcome>)> = units
        .par_iter()
        .map(|unit| (unit.clone(), render_unit(unit, context)))
        .collect();

    let mut report = TemplateReport::default();
    for (file, result) in results {
        match result {
            Ok(FileOutcome::Rendered) => report.rendered.push(file),
            Ok(FileOutcome::Untouched) => report.untouched.push(file),
            Err(error) => report.failures.push(TemplateFailure { file, error }),
        }
    }
    report.rendered.sort();
    report.untouched.sort();
    report.failures.sort_by(|a, b| a.file.cmp(&b.file));

    tracing::debug!(
        rendered = report.rendered.len(),
        untouched = report.untouched.len(),
        failed = report.failures.len(),
        "template pass complete"
    );
    report
}

enum FileOutcome {
    Rendered,
    Untouched,
}

fn render_unit(path: &Path, context: &Value) -> StagehandResult<FileOutcome> {
    let bytes = std::fs::read(path)?;
    let Ok(content) = std::str::from_utf8(&bytes) else {
        // Binary content carries no expressions; cheap path.
        return Ok(FileOutcome::Untouched);
    };

    match syntax::detect(content) {
        SyntaxKind::None => Ok(FileOutcome::Untouched),
        SyntaxKind::Conflicting => Err(StagehandError::AmbiguousSyntax {
            file: path.to_path_buf(),
        }),
        kind => {
            let rendered = render::render(content, kind, context, path)?;
            replace_with_rendered(path, &rendered)?;
            Ok(FileOutcome::Rendered)
        }
    }
}

/// Swap the materialized symlink for a plain file holding `rendered`.
///
/// The rendered text is staged in the destination directory first so the
/// final rename is atomic; the symlink is only removed once the replacement
/// is fully written.
fn replace_with_rendered(path: &Path, rendered: &str) -> StagehandResult<()> {
    let dir = path.parent().ok_or_else(|| {
        StagehandError::Io(std::io::Error::other(format!(
            "no parent directory for '{}'",
            path.display()
        )))
    })?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(rendered.as_bytes())?;
    std::fs::remove_file(path)?;
    staged.persist(path).map_err(|e| StagehandError::Io(e.error))?;
    Ok(())
}
