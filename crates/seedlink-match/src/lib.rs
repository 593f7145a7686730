//! Manifest matching for seedlink.
//!
//! Pure, synchronous, no I/O:
//!
//! 1. [`SizeMatcher`] indexes an inventory by size and lists the candidates
//!    of every manifest entry (exact 64-bit equality).
//! 2. [`resolve`] turns the candidates into a [`LinkPlan`]: unmatched and
//!    ambiguous entries are rejected, unique candidates are claimed through
//!    a [`ClaimTable`] in manifest order.
//!
//! ```rust
//! use std::path::Path;
//! use seedlink_core::{InventoryEntry, ManifestEntry};
//! use seedlink_match::{match_manifest, resolve};
//!
//! let manifest = vec![ManifestEntry::new("a/x.bin", 100)];
//! let inventory = vec![InventoryEntry::new("/src/p1", "p1", 100)];
//!
//! let report = match_manifest(&manifest, &inventory);
//! let resolution = resolve(&report, Path::new("/dest"));
//! assert_eq!(resolution.plan.len(), 1);
//! ```

mod claims;
mod matcher;

pub use claims::{ClaimTable, LinkPlan, PlannedLink, Rejection, Resolution, resolve};
pub use matcher::{EntryMatch, MatchReport, MatchStatus, SizeMatcher, match_manifest};
