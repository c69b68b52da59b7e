//! Bundle pipeline: resolve → materialize → render
//!
//! A bundle turns ordered artifact rules into a freshly rebuilt deploy root.
//! [`BundleContext`] pins down the two directories involved and their
//! invariants; [`Bundler`] drives the three local stages in order. Stage
//! reconciliation (diff + sync) lives in [`crate::stage`] and is driven by
//! the caller against an explicit remote listing snapshot.

mod map;
mod materialize;

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{StagehandError, StagehandResult};
use crate::paths;
use crate::rules::ArtifactRule;
use crate::template::{self, TemplateReport};

pub use map::{BundleMap, ResolvedArtifact};

/// The two directories a bundle operates on.
///
/// The project root must exist; the deploy root must be a strict descendant
/// of it (never the project root itself, never a plain file). The deploy
/// root is exclusively owned for the duration of one bundle operation.
#[derive(Debug, Clone)]
pub struct BundleContext {
    project_root: PathBuf,
    deploy_root: PathBuf,
}

impl BundleContext {
    /// Validate and pin the project and deploy roots.
    ///
    /// `deploy_root` may be relative (resolved against the project root) or
    /// absolute; either way it must land strictly inside the project root.
    pub fn new(
        project_root: impl AsRef<Path>,
        deploy_root: impl AsRef<Path>,
    ) -> StagehandResult<Self> {
        let project_root = std::fs::canonicalize(project_root.as_ref())?;

        let raw = deploy_root.as_ref();
        let deploy_root = if raw.is_absolute() {
            paths::lexical_absolute(raw)
        } else {
            let rel = paths::normalize_within(raw).ok_or_else(|| {
                StagehandError::config(format!(
                    "deploy root '{}' escapes the project root",
                    raw.display()
                ))
            })?;
            project_root.join(rel)
        };

        if !paths::is_strict_descendant(&deploy_root, &project_root) {
            return Err(StagehandError::config(format!(
                "deploy root '{}' must be a strict descendant of the project root '{}'",
                deploy_root.display(),
                project_root.display()
            )));
        }
        match std::fs::symlink_metadata(&deploy_root) {
            Ok(meta) if !meta.is_dir() => {
                return Err(StagehandError::config(format!(
                    "deploy root '{}' exists and is not a directory",
                    deploy_root.display()
                )));
            }
            _ => {}
        }

        Ok(Self {
            project_root,
            deploy_root,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn deploy_root(&self) -> &Path {
        &self.deploy_root
    }
}

/// Outcome of one bundle run.
#[derive(Debug, Default)]
pub struct BundleReport {
    /// File entries placed into the deploy root.
    pub placed: usize,
    /// Template pass results, file-scoped.
    pub templates: TemplateReport,
}

impl BundleReport {
    /// Whether every stage, including per-file template rendering, succeeded.
    pub fn is_success(&self) -> bool {
        self.templates.is_success()
    }
}

/// Drives resolve → materialize → render for one deploy root.
pub struct Bundler {
    ctx: BundleContext,
    rules: Vec<ArtifactRule>,
    template_context: Value,
}

impl Bundler {
    pub fn new(ctx: BundleContext, rules: Vec<ArtifactRule>) -> Self {
        Self {
            ctx,
            rules,
            template_context: Value::Null,
        }
    }

    /// Supply the read-only key/value context for template expansion.
    pub fn with_template_context(mut self, context: Value) -> Self {
        self.template_context = context;
        self
    }

    pub fn context(&self) -> &BundleContext {
        &self.ctx
    }

    /// Resolve rules without touching the deploy root.
    pub fn resolve(&self) -> StagehandResult<BundleMap> {
        BundleMap::resolve(&self.ctx, &self.rules)
    }

    /// Run the full local pipeline. Resolver and materializer failures abort
    /// immediately; template failures are file-scoped and land in the
    /// report.
    pub fn run(&self) -> StagehandResult<BundleReport> {
        let map = self.resolve()?;
        let placed = materialize::materialize(self.ctx.deploy_root(), &map)?;

        let units = collect_template_units(&self.ctx, &map)?;
        let templates = template::render_units(&units, &self.template_context);

        tracing::info!(
            placed,
            rendered = templates.rendered.len(),
            template_failures = templates.failures.len(),
            "bundle complete"
        );
        Ok(BundleReport { placed, templates })
    }
}

/// Destination files eligible for template expansion: every file materialized
/// from a rule that requested the `templates` processor.
fn collect_template_units(ctx: &BundleContext, map: &BundleMap) -> StagehandResult<Vec<PathBuf>> {
    let mut units = Vec::new();
    for (dest, artifact) in map.entries() {
        if !artifact.processors.contains(&crate::rules::Processor::Templates) {
            continue;
        }
        let dest_abs = ctx.deploy_root().join(dest);
        let meta = std::fs::symlink_metadata(&dest_abs)?;
        if meta.is_dir() {
            // Directory entries expand to every file below them.
            let mut stack = vec![dest_abs];
            while let Some(dir) = stack.pop() {
                let mut children: Vec<PathBuf> = std::fs::read_dir(&dir)?
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<Result<_, _>>()?;
                children.sort();
                for child in children {
                    if child.symlink_metadata()?.is_dir() {
                        stack.push(child);
                    } else {
                        units.push(child);
                    }
                }
            }
        } else {
            units.push(dest_abs);
        }
    }
    units.sort();
    Ok(units)
}
