//! Manifest and inventory entries.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A file declared by a manifest: where it must live and how big it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the destination root.
    pub relative_path: PathBuf,
    /// Exact size in bytes.
    pub expected_size: u64,
}

impl ManifestEntry {
    /// Create a new manifest entry.
    pub fn new(relative_path: impl Into<PathBuf>, expected_size: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            expected_size,
        }
    }

    /// Resolve this entry under a destination root.
    ///
    /// Returns `None` when the relative path is absolute, contains `..` or
    /// is empty, so the result always stays inside `root`.
    pub fn destination_in(&self, root: &Path) -> Option<PathBuf> {
        normalize_relative(&self.relative_path).map(|relative| root.join(relative))
    }
}

/// Strip `.` components and refuse anything that could escape the root.
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// A real file discovered while walking the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Path relative to the walked root.
    pub relative_path: PathBuf,
    /// Size in bytes as reported by the filesystem.
    pub size: u64,
    /// Whether the entry itself is a symbolic link.
    pub is_symlink: bool,
}

impl InventoryEntry {
    /// Create an inventory entry for a regular file.
    pub fn new(path: impl Into<PathBuf>, relative_path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            size,
            is_symlink: false,
        }
    }

    /// Mark this entry as a symbolic link.
    pub fn symlink(mut self) -> Self {
        self.is_symlink = true;
        self
    }
}
