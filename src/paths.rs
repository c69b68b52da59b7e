//! Path containment primitives
//!
//! The deploy root is a sandbox. Every destination must be proven a lexical
//! descendant of it before any filesystem access, and whatever already exists
//! at a destination must resolve back inside it before being replaced. These
//! helpers are pure path-component logic except where resolution of an
//! on-disk entry is explicitly required.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a relative path against an implicit root.
///
/// `.` components are dropped and `..` components fold onto the previous
/// segment. Returns `None` when the path is absolute, carries a filesystem
/// prefix, or would climb above the root. An empty result (e.g. `"."` or
/// `"./"`) is valid and denotes the root itself.
pub fn normalize_within(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

/// Lexically fold `.` and `..` components of an absolute path.
///
/// Used to reason about symlink targets that cannot be canonicalized because
/// they do not exist. `..` at the filesystem root stays at the root.
pub fn lexical_absolute(path: &Path) -> PathBuf {
    let mut folded = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                folded.pop();
            }
            Component::CurDir => {}
            other => folded.push(other),
        }
    }
    folded
}

/// Whether `path` is a strict descendant of `root` (never `root` itself).
///
/// Purely lexical; both paths are expected to be in the same (normalized or
/// canonical) form.
pub fn is_strict_descendant(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

/// Resolve an existing filesystem entry to the path it denotes.
///
/// Regular files and directories canonicalize directly. Symlinks resolve to
/// their canonical target; a broken symlink resolves lexically from its link
/// target so that containment can still be judged.
pub fn resolve_existing(path: &Path) -> io::Result<PathBuf> {
    let meta = std::fs::symlink_metadata(path)?;
    if !meta.file_type().is_symlink() {
        return std::fs::canonicalize(path);
    }
    match std::fs::canonicalize(path) {
        Ok(resolved) => Ok(resolved),
        Err(_) => {
            let target = std::fs::read_link(path)?;
            let absolute = if target.is_absolute() {
                target
            } else {
                path.parent().unwrap_or(Path::new("/")).join(target)
            };
            Ok(lexical_absolute(&absolute))
        }
    }
}
