//! Error types for walking, manifest loading and whole runs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a directory walk.
///
/// A walk is all-or-nothing: any of these discards the partial inventory.
#[derive(Debug, Error)]
pub enum WalkError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The walk was cancelled before it completed.
    #[error("Walk cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

impl WalkError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors raised while loading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("Cannot read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or has the wrong shape.
    #[error("Cannot parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest declares no files.
    #[error("Manifest {name} declares no files")]
    Empty { name: String },

    /// An entry would resolve outside the destination root.
    #[error("Manifest {name} has unsafe entry path \"{path}\"")]
    UnsafePath { name: String, path: String },

    /// The same relative path is declared twice.
    #[error("Manifest {name} declares \"{path}\" more than once")]
    DuplicatePath { name: String, path: PathBuf },

    /// An entry would have to live inside another entry's file.
    #[error("Manifest {name} declares \"{path}\" inside file \"{parent}\"")]
    OverlappingPath {
        name: String,
        path: PathBuf,
        parent: PathBuf,
    },
}

/// Structural failures that abort a run before any mutation.
#[derive(Debug, Error)]
pub enum RunError {
    /// A root directory is missing or not a directory.
    #[error("Directory does not exist: {path}")]
    MissingDirectory { path: PathBuf },

    /// A manifest failed to load.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The source walk failed.
    #[error("Walking source directory failed: {0}")]
    Walk(#[from] WalkError),

    /// A background task panicked or was aborted.
    #[error("Background task failed: {message}")]
    Task { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_error_io() {
        let err = WalkError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, WalkError::PermissionDenied { .. }));

        let err = WalkError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, WalkError::NotFound { .. }));

        let err = WalkError::io("/test/path", std::io::Error::other("boom"));
        assert!(err.to_string().contains("/test/path"));
    }

    #[test]
    fn test_run_error_wraps_walk_error() {
        let err: RunError = WalkError::Cancelled.into();
        assert!(matches!(err, RunError::Walk(WalkError::Cancelled)));
        assert!(err.to_string().contains("cancelled"));
    }
}
