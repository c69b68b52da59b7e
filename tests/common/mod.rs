//! Shared fixtures for the integration suites.

use std::path::Path;

use stagehand::BundleContext;
use tempfile::TempDir;

/// A throwaway project tree with a conventional deploy root.
pub struct ProjectFixture {
    pub dir: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create project tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file under the project root, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dirs");
        }
        std::fs::write(path, content).expect("write fixture file");
        self
    }

    /// Context with the conventional `output/deploy` root.
    pub fn context(&self) -> BundleContext {
        BundleContext::new(self.root(), "output/deploy").expect("valid bundle context")
    }
}

/// Whether the path is currently a symlink (without following it).
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
