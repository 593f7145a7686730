//! Source tree walker for seedlink.
//!
//! Enumerates a directory recursively into a flat inventory of
//! `(path, size)` entries. Key features:
//!
//! - **Concurrent traversal** with one rayon task per directory entry
//! - **All-or-nothing** results: the first I/O failure cancels every branch
//! - **Progress updates** via broadcast channels at 10, 100, 1000, ... files
//! - **Filter predicates** so callers can skip already-linked files
//!
//! # Example
//!
//! ```rust,no_run
//! use seedlink_scan::{TreeWalker, WalkConfig};
//!
//! let config = WalkConfig::new("/srv/seed");
//! let inventory = TreeWalker::new().walk(&config).unwrap();
//!
//! println!("Found {} files", inventory.len());
//! ```

mod progress;
mod visited;
mod walker;

pub use progress::WalkProgress;
pub use visited::{DirId, VisitedDirs};
pub use walker::TreeWalker;

// Re-export core types for convenience
pub use seedlink_core::{FileSystem, InventoryEntry, LocalFs, WalkConfig, WalkError};
