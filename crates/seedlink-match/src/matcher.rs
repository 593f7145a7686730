//! Size-based candidate matching.
//!
//! Every manifest entry is compared against the inventory by exact byte
//! length. No content is read. Ambiguity is recorded, never resolved here.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use seedlink_core::{InventoryEntry, ManifestEntry};

/// How many candidates a manifest entry has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Exactly one inventory file has the expected size.
    Unique,
    /// Several inventory files have the expected size.
    Ambiguous,
    /// No inventory file has the expected size.
    Unmatched,
}

/// Candidates for one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMatch {
    /// Position of the entry in the manifest.
    pub index: usize,
    /// The manifest entry.
    pub entry: ManifestEntry,
    /// Candidate paths, sorted.
    pub candidates: Vec<PathBuf>,
}

impl EntryMatch {
    /// Classify by candidate count.
    pub fn status(&self) -> MatchStatus {
        match self.candidates.len() {
            0 => MatchStatus::Unmatched,
            1 => MatchStatus::Unique,
            _ => MatchStatus::Ambiguous,
        }
    }

    /// The single candidate, if there is exactly one.
    pub fn unique_candidate(&self) -> Option<&PathBuf> {
        match self.candidates.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Matcher output for a whole manifest, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// One match per manifest entry.
    pub matches: Vec<EntryMatch>,
}

impl MatchReport {
    /// Status of each entry, in manifest order.
    pub fn classifications(&self) -> Vec<MatchStatus> {
        self.matches.iter().map(EntryMatch::status).collect()
    }

    /// Number of entries with the given status.
    pub fn count(&self, status: MatchStatus) -> usize {
        self.matches.iter().filter(|m| m.status() == status).count()
    }
}

/// Index of inventory paths by file size.
///
/// Build it once per walk and reuse it for every manifest.
#[derive(Debug, Clone, Default)]
pub struct SizeMatcher {
    by_size: HashMap<u64, Vec<PathBuf>>,
}

impl SizeMatcher {
    /// Index an inventory.
    pub fn new(inventory: &[InventoryEntry]) -> Self {
        let mut by_size: HashMap<u64, Vec<PathBuf>> = HashMap::new();
        for item in inventory {
            by_size.entry(item.size).or_default().push(item.path.clone());
        }
        for paths in by_size.values_mut() {
            paths.sort();
            paths.dedup();
        }
        Self { by_size }
    }

    /// Number of distinct sizes indexed.
    pub fn distinct_sizes(&self) -> usize {
        self.by_size.len()
    }

    /// Inventory paths with exactly this size.
    pub fn candidates(&self, size: u64) -> &[PathBuf] {
        self.by_size.get(&size).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Compute candidates for every manifest entry.
    pub fn match_entries(&self, manifest: &[ManifestEntry]) -> MatchReport {
        let matches = manifest
            .iter()
            .enumerate()
            .map(|(index, entry)| EntryMatch {
                index,
                entry: entry.clone(),
                candidates: self.candidates(entry.expected_size).to_vec(),
            })
            .collect();

        MatchReport { matches }
    }
}

/// Match a manifest against an inventory in one call.
pub fn match_manifest(manifest: &[ManifestEntry], inventory: &[InventoryEntry]) -> MatchReport {
    SizeMatcher::new(inventory).match_entries(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(path: &str, size: u64) -> InventoryEntry {
        InventoryEntry::new(path, path.trim_start_matches('/'), size)
    }

    #[test]
    fn test_exact_size_equality() {
        let report = match_manifest(
            &[ManifestEntry::new("x", 100)],
            &[inv("/s/99", 99), inv("/s/100", 100), inv("/s/101", 101)],
        );

        assert_eq!(report.matches[0].candidates, vec![PathBuf::from("/s/100")]);
        assert_eq!(report.matches[0].status(), MatchStatus::Unique);
    }

    #[test]
    fn test_classifications() {
        let report = match_manifest(
            &[
                ManifestEntry::new("one", 1),
                ManifestEntry::new("two", 2),
                ManifestEntry::new("three", 3),
            ],
            &[inv("/s/a", 1), inv("/s/b", 2), inv("/s/c", 2)],
        );

        assert_eq!(
            report.classifications(),
            vec![
                MatchStatus::Unique,
                MatchStatus::Ambiguous,
                MatchStatus::Unmatched
            ]
        );
        assert_eq!(report.count(MatchStatus::Ambiguous), 1);
        assert!(report.matches[1].unique_candidate().is_none());
    }

    #[test]
    fn test_large_sizes_compare_exactly() {
        let big = u64::MAX - 1;
        let report = match_manifest(
            &[ManifestEntry::new("huge", big)],
            &[inv("/s/a", u64::MAX), inv("/s/b", big)],
        );

        assert_eq!(report.matches[0].unique_candidate(), Some(&PathBuf::from("/s/b")));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(match_manifest(&[], &[inv("/s/a", 1)]).matches.is_empty());

        let report = match_manifest(&[ManifestEntry::new("a", 0)], &[]);
        assert_eq!(report.classifications(), vec![MatchStatus::Unmatched]);
    }
}
