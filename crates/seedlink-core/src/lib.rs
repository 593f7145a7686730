//! Core types and traits for seedlink.
//!
//! This crate provides the data model shared by the walker, matcher and
//! materializer: manifest and inventory entries, per-entry dispositions,
//! run summaries, configuration and the filesystem capability trait.

mod config;
mod entry;
mod error;
mod fs;
mod manifest;
mod outcome;

pub use config::{LinkConfig, LinkConfigBuilder, WalkConfig, WalkConfigBuilder};
pub use entry::{InventoryEntry, ManifestEntry, normalize_relative};
pub use error::{ManifestError, RunError, WalkError};
pub use fs::{FileKind, FileStat, FileSystem, LocalFs};
pub use manifest::Manifest;
pub use outcome::{
    ConflictReason, Disposition, EntryOutcome, FailureReason, RunReport, RunSummary,
    SummaryCounts,
};
