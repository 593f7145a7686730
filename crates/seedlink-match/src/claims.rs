//! Claim table and link plan construction.
//!
//! An inventory file may be a candidate for several manifest entries, but it
//! can back at most one link. Claims are taken in manifest order, so the
//! earliest entry wins and every later one is reported as a conflict.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use seedlink_core::{ConflictReason, Disposition, EntryOutcome, FailureReason, ManifestEntry};

use crate::matcher::{EntryMatch, MatchReport};

/// Which manifest entry owns each claimed inventory path.
///
/// Iteration follows claim order, which is manifest order.
#[derive(Debug, Clone, Default)]
pub struct ClaimTable {
    claims: IndexMap<PathBuf, usize>,
}

impl ClaimTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `source` for manifest entry `index`.
    ///
    /// Returns the index of the existing owner if the path is taken.
    pub fn claim(&mut self, source: &Path, index: usize) -> Result<(), usize> {
        match self.claims.entry(source.to_path_buf()) {
            Entry::Occupied(owner) => Err(*owner.get()),
            Entry::Vacant(slot) => {
                slot.insert(index);
                Ok(())
            }
        }
    }

    /// Owner of a claimed path.
    pub fn owner(&self, source: &Path) -> Option<usize> {
        self.claims.get(source).copied()
    }

    /// Claimed paths with their owners, in claim order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, usize)> {
        self.claims.iter().map(|(path, index)| (path, *index))
    }

    /// Number of claims.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Check if nothing has been claimed.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// One resolved link: manifest entry to chosen source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedLink {
    /// Position of the entry in the manifest.
    pub index: usize,
    /// The manifest entry.
    pub entry: ManifestEntry,
    /// Existing file the link points at.
    pub source: PathBuf,
    /// Where the link is created.
    pub destination: PathBuf,
}

/// Links to create, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPlan {
    pub links: Vec<PlannedLink>,
}

impl LinkPlan {
    /// Number of planned links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if there is nothing to link.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// A manifest entry left out of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Position of the entry in the manifest.
    pub index: usize,
    /// Unmatched or conflicted outcome.
    pub outcome: EntryOutcome,
}

/// Result of turning a match report into a plan.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Entries that will be materialized.
    pub plan: LinkPlan,
    /// Entries that will not, with their reason.
    pub rejected: Vec<Rejection>,
    /// Final claim table.
    pub claims: ClaimTable,
}

/// Build the link plan for a match report.
///
/// Entries with no candidate are unmatched, entries with several are
/// conflicted, and unique candidates are claimed in manifest order. Entries
/// whose path would leave `destination_root` fail without claiming.
pub fn resolve(report: &MatchReport, destination_root: &Path) -> Resolution {
    let mut resolution = Resolution::default();

    for entry_match in &report.matches {
        let EntryMatch { index, entry, .. } = entry_match;
        let Some(destination) = entry.destination_in(destination_root) else {
            warn!(entry = %entry.relative_path.display(), "Entry path escapes the destination root");
            resolution.rejected.push(Rejection {
                index: *index,
                outcome: EntryOutcome::new(
                    entry.clone(),
                    entry.relative_path.clone(),
                    Disposition::Failed {
                        reason: FailureReason::UnsafePath {
                            path: entry.relative_path.clone(),
                        },
                    },
                ),
            });
            continue;
        };

        let reject = |disposition| Rejection {
            index: *index,
            outcome: EntryOutcome::new(entry.clone(), destination.clone(), disposition),
        };

        let source = match entry_match.candidates.as_slice() {
            [] => {
                debug!(entry = %entry.relative_path.display(), "No match");
                resolution.rejected.push(reject(Disposition::Unmatched));
                continue;
            }
            [only] => only,
            many => {
                warn!(
                    entry = %entry.relative_path.display(),
                    candidates = many.len(),
                    "More than one match, cannot safely link"
                );
                resolution.rejected.push(reject(Disposition::Conflicted {
                    reason: ConflictReason::MultipleCandidates {
                        candidates: many.to_vec(),
                    },
                }));
                continue;
            }
        };

        if let Err(owner) = resolution.claims.claim(source, *index) {
            let claimed_by = report
                .matches
                .get(owner)
                .map(|m| m.entry.relative_path.clone())
                .unwrap_or_default();
            warn!(
                entry = %entry.relative_path.display(),
                source = %source.display(),
                "Source already claimed by {}",
                claimed_by.display()
            );
            resolution.rejected.push(reject(Disposition::Conflicted {
                reason: ConflictReason::ClaimedBy {
                    source: source.clone(),
                    claimed_by,
                },
            }));
            continue;
        }

        resolution.plan.links.push(PlannedLink {
            index: *index,
            entry: entry.clone(),
            source: source.clone(),
            destination,
        });
    }

    resolution
}
