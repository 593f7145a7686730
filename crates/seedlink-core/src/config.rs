//! Walk and link configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for walking a source tree.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct WalkConfig {
    /// Root directory to walk.
    pub root: PathBuf,

    /// Follow symbolic links instead of reporting them as leaves.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// File name patterns to skip (glob syntax).
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of threads for walking (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Announce progress each time the file count reaches the next power of this base.
    #[builder(default = "10")]
    #[serde(default = "default_progress_base")]
    pub progress_base: u64,
}

fn default_true() -> bool {
    true
}

fn default_progress_base() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    16
}

impl WalkConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(base) = self.progress_base {
            if base < 2 {
                return Err("Progress base must be at least 2".to_string());
            }
        }
        Ok(())
    }
}

impl WalkConfig {
    /// Create a new walk config builder.
    pub fn builder() -> WalkConfigBuilder {
        WalkConfigBuilder::default()
    }

    /// Create a simple config for walking a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            include_hidden: true,
            ignore_patterns: Vec::new(),
            threads: 0,
            progress_base: default_progress_base(),
        }
    }

    /// Check if hidden files should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Configuration for reconciling a manifest against a source tree.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct LinkConfig {
    /// Directory holding the already-downloaded files.
    pub source_root: PathBuf,

    /// Directory where the mirrored link tree is created.
    pub destination_root: PathBuf,

    /// Run every check but leave the filesystem untouched.
    #[builder(default = "false")]
    #[serde(default)]
    pub dry_run: bool,

    /// Maximum number of entries materialized at once.
    #[builder(default = "16")]
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl LinkConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        for (label, path) in [
            ("Source root", &self.source_root),
            ("Destination root", &self.destination_root),
        ] {
            match path {
                Some(p) if p.as_os_str().is_empty() => {
                    return Err(format!("{label} cannot be empty"));
                }
                None => return Err(format!("{label} is required")),
                _ => {}
            }
        }
        if self.max_concurrent == Some(0) {
            return Err("Concurrency limit must be at least 1".to_string());
        }
        Ok(())
    }
}

impl LinkConfig {
    /// Create a new link config builder.
    pub fn builder() -> LinkConfigBuilder {
        LinkConfigBuilder::default()
    }

    /// Create a config with default options.
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            dry_run: false,
            max_concurrent: default_max_concurrent(),
        }
    }

    /// Walk configuration for the source side of this run.
    pub fn walk_config(&self) -> WalkConfig {
        WalkConfig::new(&self.source_root)
    }
}
