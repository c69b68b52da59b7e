//! Artifact mapping resolver
//!
//! Expands each rule's source glob against the project root and assigns
//! every match a destination below the deploy root, producing a
//! [`BundleMap`]. Globs and destinations are vetted lexically before any
//! filesystem access; collisions between distinct sources are hard errors.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::bundle::BundleContext;
use crate::error::{StagehandError, StagehandResult};
use crate::paths;
use crate::rules::{ArtifactRule, Processor};

/// One resolved source for a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Absolute source path under the project root.
    pub source: PathBuf,
    /// Processors inherited from the rule(s) that produced this pair.
    pub processors: Vec<Processor>,
}

/// Destination-keyed map of resolved source→destination pairs.
///
/// Keys are destination paths relative to the deploy root, normalized and
/// proven lexical descendants of it. Iteration order is sorted.
#[derive(Debug, Default)]
pub struct BundleMap {
    entries: BTreeMap<PathBuf, ResolvedArtifact>,
}

impl BundleMap {
    /// Resolve ordered rules into a map, or fail on the first bad rule.
    pub fn resolve(ctx: &BundleContext, rules: &[ArtifactRule]) -> StagehandResult<Self> {
        let mut map = BundleMap::default();
        for rule in rules {
            map.resolve_rule(ctx, rule)?;
        }
        tracing::debug!(entries = map.len(), "resolved artifact mappings");
        Ok(map)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Path, &ResolvedArtifact)> {
        self.entries.iter().map(|(k, v)| (k.as_path(), v))
    }

    pub fn get(&self, dest: &Path) -> Option<&ResolvedArtifact> {
        self.entries.get(dest)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn resolve_rule(&mut self, ctx: &BundleContext, rule: &ArtifactRule) -> StagehandResult<()> {
        let dest_prefix = validate_destination(ctx, &rule.dest)?;
        let sources = expand_sources(ctx, &rule.src)?;
        if sources.is_empty() {
            return Err(StagehandError::NoMatch {
                pattern: rule.src.clone(),
            });
        }

        // A destination without a trailing separator names the result only
        // for a single regular-file match; directories and multi-file
        // matches always treat it as a directory prefix.
        let single_file = sources.len() == 1 && sources[0].is_file();
        let names_file = single_file
            && !has_trailing_separator(&rule.dest)
            && !dest_prefix.as_os_str().is_empty();

        for source in sources {
            let dest = if names_file {
                dest_prefix.clone()
            } else {
                let name = source.file_name().ok_or_else(|| {
                    StagehandError::config(format!(
                        "source '{}' has no file name",
                        source.display()
                    ))
                })?;
                dest_prefix.join(name)
            };
            self.insert(dest, source, &rule.processors)?;
        }
        Ok(())
    }

    fn insert(
        &mut self,
        dest: PathBuf,
        source: PathBuf,
        processors: &[Processor],
    ) -> StagehandResult<()> {
        match self.entries.entry(dest) {
            Entry::Vacant(slot) => {
                slot.insert(ResolvedArtifact {
                    source,
                    processors: processors.to_vec(),
                });
            }
            Entry::Occupied(mut slot) => {
                if slot.get().source != source {
                    return Err(StagehandError::DestinationCollision {
                        destination: slot.key().clone(),
                        first: slot.get().source.clone(),
                        second: source,
                    });
                }
                // Same pair mapped twice: merge any new processors, keep order.
                let existing = &mut slot.get_mut().processors;
                for processor in processors {
                    if !existing.contains(processor) {
                        existing.push(*processor);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Vet a rule destination: relative, and a lexical descendant of the deploy
/// root once joined. Pure path-component logic, no I/O.
fn validate_destination(ctx: &BundleContext, dest: &str) -> StagehandResult<PathBuf> {
    if dest.is_empty() {
        return Err(StagehandError::config("destination must not be empty"));
    }
    let dest_path = Path::new(dest);
    if dest_path.is_absolute() {
        return Err(StagehandError::config(format!(
            "destination '{dest}' must be relative to the deploy root"
        )));
    }
    paths::normalize_within(dest_path).ok_or_else(|| StagehandError::ContainmentViolation {
        path: dest_path.to_path_buf(),
        root: ctx.deploy_root().to_path_buf(),
    })
}

fn has_trailing_separator(dest: &str) -> bool {
    dest.ends_with('/') || dest.ends_with(std::path::MAIN_SEPARATOR)
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Expand a source glob against the project root.
///
/// Absolute patterns and patterns with `..` components are rejected before
/// touching the filesystem. The deploy root subtree never matches. When both
/// a directory and its descendants match, only the directory is kept; its
/// recursion covers the rest.
fn expand_sources(ctx: &BundleContext, pattern: &str) -> StagehandResult<Vec<PathBuf>> {
    if pattern.is_empty() {
        return Err(StagehandError::config("source pattern must not be empty"));
    }
    if Path::new(pattern).is_absolute() {
        return Err(StagehandError::config(format!(
            "source pattern '{pattern}' must be relative to the project root"
        )));
    }
    if Path::new(pattern)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(StagehandError::config(format!(
            "source pattern '{pattern}' may not escape the project root"
        )));
    }

    // Literal patterns resolve with a direct lookup. A dangling symlink
    // still counts as a match; classification fails on it later.
    if !has_glob_meta(pattern) {
        let candidate = ctx.project_root().join(pattern);
        if candidate.starts_with(ctx.deploy_root()) || candidate.symlink_metadata().is_err() {
            return Ok(Vec::new());
        }
        return Ok(vec![candidate]);
    }

    let matcher = compile_glob(pattern)?;
    let mut matches = Vec::new();
    let walker = ignore::WalkBuilder::new(ctx.project_root())
        .standard_filters(false)
        .follow_links(false)
        .build();
    for entry in walker {
        let entry = entry.map_err(|e| StagehandError::Io(std::io::Error::other(e)))?;
        if entry.depth() == 0 || entry.path().starts_with(ctx.deploy_root()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(ctx.project_root())
            .expect("walk entries live under the project root");
        if matcher.is_match(rel) {
            matches.push(entry.path().to_path_buf());
        }
    }
    matches.sort();

    // Drop matches subsumed by a matched ancestor directory.
    let mut kept: Vec<PathBuf> = Vec::new();
    for candidate in matches {
        if kept
            .iter()
            .any(|ancestor| candidate.starts_with(ancestor) && candidate != *ancestor)
        {
            continue;
        }
        kept.push(candidate);
    }
    Ok(kept)
}

fn compile_glob(pattern: &str) -> StagehandResult<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| StagehandError::config(format!("invalid source pattern '{pattern}': {e}")))?;
    Ok(glob.compile_matcher())
}
