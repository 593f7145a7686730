//! Manifest loading.
//!
//! The engine consumes an in-memory [`Manifest`]. The JSON encoding below is
//! what the command-line front end reads; it mirrors the file list of a
//! multi-file torrent:
//!
//! ```json
//! {
//!   "name": "dataset",
//!   "files": [
//!     { "path": "a/x.bin", "length": 100 },
//!     { "path": ["b", "z.bin"], "length": 200 }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entry::{ManifestEntry, normalize_relative};
use crate::error::ManifestError;

/// An ordered list of expected files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Display name of the manifest.
    pub name: String,
    /// Entries in declaration order.
    pub entries: Vec<ManifestEntry>,
}

#[derive(Deserialize)]
struct RawManifest {
    name: Option<String>,
    files: Vec<RawFile>,
}

#[derive(Deserialize)]
struct RawFile {
    path: RawPath,
    length: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPath {
    Joined(String),
    Components(Vec<String>),
}

impl RawPath {
    fn display(&self) -> String {
        match self {
            Self::Joined(s) => s.clone(),
            Self::Components(parts) => parts.join("/"),
        }
    }

    fn to_path(&self) -> PathBuf {
        match self {
            Self::Joined(s) => PathBuf::from(s),
            Self::Components(parts) => parts.iter().collect(),
        }
    }
}

impl Manifest {
    /// Create a manifest from already-parsed entries.
    pub fn new(name: impl Into<String>, entries: Vec<ManifestEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Load and validate a JSON manifest from disk.
    ///
    /// The file stem is used as the name when the manifest has none.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawManifest =
            serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_raw(raw, fallback)
    }

    /// Parse and validate a JSON manifest held in memory.
    pub fn from_json(name: &str, json: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest =
            serde_json::from_str(json).map_err(|source| ManifestError::Parse {
                path: PathBuf::from(name),
                source,
            })?;
        Self::from_raw(raw, name.to_string())
    }

    fn from_raw(raw: RawManifest, fallback_name: String) -> Result<Self, ManifestError> {
        let name = raw.name.unwrap_or(fallback_name);
        if raw.files.is_empty() {
            return Err(ManifestError::Empty { name });
        }

        let mut entries = Vec::with_capacity(raw.files.len());
        for file in raw.files {
            let relative = normalize_relative(&file.path.to_path()).ok_or_else(|| {
                ManifestError::UnsafePath {
                    name: name.clone(),
                    path: file.path.display(),
                }
            })?;
            entries.push(ManifestEntry::new(relative, file.length));
        }

        let manifest = Self { name, entries };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check that every entry resolves to its own place inside a root.
    ///
    /// Rejects empty manifests, absolute or `..` paths, paths declared twice,
    /// and entries that would live inside another entry (`a` and `a/b`).
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.entries.is_empty() {
            return Err(ManifestError::Empty {
                name: self.name.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            let relative = normalize_relative(&entry.relative_path).ok_or_else(|| {
                ManifestError::UnsafePath {
                    name: self.name.clone(),
                    path: entry.relative_path.display().to_string(),
                }
            })?;
            if !seen.insert(relative.clone()) {
                return Err(ManifestError::DuplicatePath {
                    name: self.name.clone(),
                    path: relative,
                });
            }
        }

        for path in &seen {
            if let Some(parent) = path.ancestors().skip(1).find(|a| seen.contains(*a)) {
                return Err(ManifestError::OverlappingPath {
                    name: self.name.clone(),
                    path: path.clone(),
                    parent: parent.to_path_buf(),
                });
            }
        }

        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all expected sizes.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.expected_size).sum()
    }
}
