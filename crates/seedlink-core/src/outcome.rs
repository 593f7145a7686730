//! Per-entry dispositions and run summaries.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::entry::ManifestEntry;

/// Why an entry was not linked because of ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictReason {
    /// More than one inventory file has the expected size.
    MultipleCandidates { candidates: Vec<PathBuf> },
    /// The only candidate was already claimed by an earlier manifest entry.
    ClaimedBy {
        source: PathBuf,
        claimed_by: PathBuf,
    },
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleCandidates { candidates } => {
                write!(f, "{} files have the expected size", candidates.len())
            }
            Self::ClaimedBy { source, claimed_by } => write!(
                f,
                "{} already claimed by {}",
                source.display(),
                claimed_by.display()
            ),
        }
    }
}

/// Why a planned operation did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The source disappeared between walk and link time.
    SourceMissing { source: PathBuf },
    /// Something already occupies the destination.
    DestinationExists { destination: PathBuf },
    /// A parent directory could not be created.
    CreateDirectory { path: PathBuf, message: String },
    /// The symbolic link could not be created.
    CreateLink { message: String },
    /// Copying file contents failed.
    Copy { message: String },
    /// The original file could not be removed after copying.
    RemoveSource { message: String },
    /// The entry path would resolve outside the destination root.
    UnsafePath { path: PathBuf },
    /// The worker task died.
    TaskFailed { message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceMissing { source } => {
                write!(f, "source \"{}\" does not exist", source.display())
            }
            Self::DestinationExists { destination } => {
                write!(f, "destination \"{}\" already exists", destination.display())
            }
            Self::CreateDirectory { path, message } => {
                write!(f, "cannot create directory \"{}\": {message}", path.display())
            }
            Self::CreateLink { message } => write!(f, "cannot create link: {message}"),
            Self::Copy { message } => write!(f, "copy failed: {message}"),
            Self::RemoveSource { message } => write!(f, "cannot remove original: {message}"),
            Self::UnsafePath { path } => {
                write!(f, "path \"{}\" escapes the destination root", path.display())
            }
            Self::TaskFailed { message } => write!(f, "task failed: {message}"),
        }
    }
}

/// Final state of one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Disposition {
    /// Link created.
    Linked { source: PathBuf },
    /// Dry-run: every check passed, nothing was changed.
    Skipped { source: PathBuf },
    /// No inventory file has the expected size.
    Unmatched,
    /// Ambiguous match, excluded from the plan.
    Conflicted { reason: ConflictReason },
    /// Planned but could not be materialized.
    Failed { reason: FailureReason },
}

impl Disposition {
    /// Whether the entry made it into the link plan.
    pub fn is_planned(&self) -> bool {
        matches!(
            self,
            Self::Linked { .. } | Self::Skipped { .. } | Self::Failed { .. }
        )
    }

    /// Short label for the disposition.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Linked { .. } => "linked",
            Self::Skipped { .. } => "skipped",
            Self::Unmatched => "unmatched",
            Self::Conflicted { .. } => "conflicted",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linked { .. } => write!(f, "linked"),
            Self::Skipped { .. } => write!(f, "skipped (dry-run)"),
            Self::Unmatched => write!(f, "unmatched"),
            Self::Conflicted { reason } => write!(f, "conflicted: {reason}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome of a single manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOutcome {
    /// The manifest entry.
    pub entry: ManifestEntry,
    /// Where the link goes (or would go).
    pub destination: PathBuf,
    /// What happened.
    pub disposition: Disposition,
}

impl EntryOutcome {
    /// Create a new entry outcome.
    pub fn new(entry: ManifestEntry, destination: PathBuf, disposition: Disposition) -> Self {
        Self {
            entry,
            destination,
            disposition,
        }
    }
}

/// Aggregate counts for a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    /// Manifest entries processed.
    pub total: usize,
    /// Entries that entered the link plan.
    pub matched: usize,
    /// Entries with no candidate.
    pub unmatched: usize,
    /// Entries rejected as ambiguous.
    pub conflicted: usize,
    /// Links created.
    pub linked: usize,
    /// Links that a dry-run would have created.
    pub skipped: usize,
    /// Planned entries that failed.
    pub link_errors: usize,
}

impl SummaryCounts {
    /// Tally a sequence of dispositions.
    pub fn tally<'a>(dispositions: impl IntoIterator<Item = &'a Disposition>) -> Self {
        let mut counts = Self::default();
        for disposition in dispositions {
            counts.total += 1;
            if disposition.is_planned() {
                counts.matched += 1;
            }
            match disposition {
                Disposition::Linked { .. } => counts.linked += 1,
                Disposition::Skipped { .. } => counts.skipped += 1,
                Disposition::Unmatched => counts.unmatched += 1,
                Disposition::Conflicted { .. } => counts.conflicted += 1,
                Disposition::Failed { .. } => counts.link_errors += 1,
            }
        }
        counts
    }

    /// Add another set of counts to this one.
    pub fn merge(&mut self, other: &Self) {
        self.total += other.total;
        self.matched += other.matched;
        self.unmatched += other.unmatched;
        self.conflicted += other.conflicted;
        self.linked += other.linked;
        self.skipped += other.skipped;
        self.link_errors += other.link_errors;
    }
}

impl fmt::Display for SummaryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries: {} matched ({} linked, {} skipped, {} failed), {} unmatched, {} conflicted",
            self.total,
            self.matched,
            self.linked,
            self.skipped,
            self.link_errors,
            self.unmatched,
            self.conflicted
        )
    }
}

/// Result of reconciling one manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Manifest name.
    pub manifest: String,
    /// Outcomes in manifest order.
    pub outcomes: Vec<EntryOutcome>,
    /// Aggregate counts over `outcomes`.
    pub counts: SummaryCounts,
}

impl RunSummary {
    /// Build a summary, computing the counts from the outcomes.
    pub fn new(manifest: impl Into<String>, outcomes: Vec<EntryOutcome>) -> Self {
        let counts = SummaryCounts::tally(outcomes.iter().map(|o| &o.disposition));
        Self {
            manifest: manifest.into(),
            outcomes,
            counts,
        }
    }

    /// Check whether any entry conflicted or failed.
    pub fn has_problems(&self) -> bool {
        self.counts.conflicted > 0 || self.counts.link_errors > 0
    }
}

/// Result of a whole run over one or more manifests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// One summary per manifest, in input order.
    pub summaries: Vec<RunSummary>,
    /// Number of files found in the source tree.
    pub inventory_size: usize,
    /// Whether the run was a dry-run.
    pub dry_run: bool,
}

impl RunReport {
    /// Counts across every manifest.
    pub fn totals(&self) -> SummaryCounts {
        let mut totals = SummaryCounts::default();
        for summary in &self.summaries {
            totals.merge(&summary.counts);
        }
        totals
    }
}
