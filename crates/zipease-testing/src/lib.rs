//! Shared test support for the zipease crates
//!
//! [`TestDir`] gives every test its own scratch space. The submodules build
//! sample trees, compare extracted output and patch archive bytes to produce
//! entries the `zip` writer cannot.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod assertions;
pub mod fixtures;
pub mod tamper;

/// Scratch directory that lives as long as the value does
///
/// Tests build their input trees, archives and extraction targets inside it.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the scratch directory; nothing is created
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `content` to `name`, creating any missing parents
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Create `name` and its parents as directories
    pub fn create_dir(&self, name: &str) -> Result<PathBuf> {
        let path = self.join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }
}
