//! Deploy-root materializer
//!
//! Rebuilds the deploy root from a resolved [`BundleMap`]: the tree is
//! deleted and recreated from scratch, then every pair is placed with an
//! explicit work-stack. Only individual files are ever symlinked, and only
//! after their destination (and anything already sitting at it) is proven
//! to resolve inside the deploy root. A source directory, even one reached
//! through a symlink, always materializes as a real directory; this is what
//! keeps a project-tree symlink from smuggling an arbitrary directory into
//! the bundle.

use std::fs;
use std::path::{Path, PathBuf};

use crate::bundle::map::BundleMap;
use crate::error::{StagehandError, StagehandResult};
use crate::paths;

/// A source path resolved to its real location and classified once.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceNode {
    File(PathBuf),
    Directory(PathBuf),
}

fn classify(source: &Path) -> StagehandResult<SourceNode> {
    let real = fs::canonicalize(source)?;
    let meta = fs::metadata(&real)?;
    if meta.is_dir() {
        Ok(SourceNode::Directory(real))
    } else {
        Ok(SourceNode::File(real))
    }
}

/// Rebuild the deploy root from the map. Returns the number of file entries
/// placed. Any failure aborts the whole bundle; partial trees are never
/// valid.
pub(crate) fn materialize(deploy_root: &Path, map: &BundleMap) -> StagehandResult<usize> {
    reset_deploy_root(deploy_root)?;
    let root = fs::canonicalize(deploy_root)?;

    // Pending (source, destination) pairs; seeded in reverse so placement
    // follows map order.
    let mut pending: Vec<(PathBuf, PathBuf)> = map
        .entries()
        .map(|(dest, artifact)| (artifact.source.clone(), root.join(dest)))
        .collect();
    pending.reverse();

    let mut placed = 0usize;
    while let Some((source, dest)) = pending.pop() {
        match classify(&source)? {
            SourceNode::File(real) => {
                place_file(&real, &dest, &root)?;
                placed += 1;
            }
            SourceNode::Directory(real) => {
                ensure_real_dir(&dest, &root)?;
                let mut children: Vec<PathBuf> = fs::read_dir(&real)?
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<Result<_, _>>()?;
                children.sort();
                for child in children.into_iter().rev() {
                    let name = child.file_name().ok_or_else(|| {
                        StagehandError::Io(std::io::Error::other(format!(
                            "unreadable directory entry under '{}'",
                            real.display()
                        )))
                    })?;
                    pending.push((child.clone(), dest.join(name)));
                }
            }
        }
    }

    tracing::debug!(placed, root = %root.display(), "materialized deploy root");
    Ok(placed)
}

/// Delete and recreate the deploy root; no incremental state is trusted.
fn reset_deploy_root(deploy_root: &Path) -> StagehandResult<()> {
    match fs::symlink_metadata(deploy_root) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(deploy_root)?,
        Ok(_) => {
            return Err(StagehandError::config(format!(
                "deploy root '{}' exists and is not a directory",
                deploy_root.display()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StagehandError::Io(e)),
    }
    fs::create_dir_all(deploy_root)?;
    Ok(())
}

/// Symlink a canonical source file at `dest`, after proving the destination
/// safe.
fn place_file(real_source: &Path, dest: &Path, root: &Path) -> StagehandResult<()> {
    let parent = dest.parent().unwrap_or(root);
    ensure_parents_real(parent, root)?;

    if fs::symlink_metadata(dest).is_ok() {
        // Something is already here (an earlier placement, or an artifact of
        // a race). It must resolve inside the deploy root before we may
        // replace it; otherwise it is left exactly as found.
        let resolved = paths::resolve_existing(dest)?;
        if !resolved.starts_with(root) {
            return Err(StagehandError::ContainmentViolation {
                path: dest.to_path_buf(),
                root: root.to_path_buf(),
            });
        }
        fs::remove_file(dest)?;
    }

    symlink_file(real_source, dest)?;
    Ok(())
}

/// Guarantee a real directory at `dest`, replacing a contained pre-existing
/// file or symlink. A symlinked directory never survives here.
fn ensure_real_dir(dest: &Path, root: &Path) -> StagehandResult<()> {
    if let Some(parent) = dest.parent() {
        if parent.starts_with(root) {
            ensure_parents_real(parent, root)?;
        }
    }
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            let resolved = paths::resolve_existing(dest)?;
            if !resolved.starts_with(root) {
                return Err(StagehandError::ContainmentViolation {
                    path: dest.to_path_buf(),
                    root: root.to_path_buf(),
                });
            }
            fs::remove_file(dest)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StagehandError::Io(e)),
    }
    fs::create_dir(dest)?;
    Ok(())
}

/// Create the directory chain from `root` down to `parent`, requiring every
/// existing component to be a real directory, never a symlink.
fn ensure_parents_real(parent: &Path, root: &Path) -> StagehandResult<()> {
    let rel = match parent.strip_prefix(root) {
        Ok(rel) => rel,
        // The destination sits directly at the root.
        Err(_) => return Ok(()),
    };
    let mut current = root.to_path_buf();
    for component in rel.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(StagehandError::ContainmentViolation {
                    path: current,
                    root: root.to_path_buf(),
                });
            }
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(StagehandError::Io(std::io::Error::other(format!(
                    "destination parent '{}' exists and is not a directory",
                    current.display()
                ))));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                fs::create_dir(&current)?;
            }
            Err(e) => return Err(StagehandError::Io(e)),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(windows)]
fn symlink_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(source, dest)
}
