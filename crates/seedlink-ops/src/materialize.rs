//! Link materialization.
//!
//! Each planned link moves through
//! `PENDING -> DIR_ENSURED -> PREFLIGHT -> LINKED | SKIPPED | FAILED`.
//! Entries are independent: one failure never stops the rest of the plan.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use seedlink_core::{Disposition, EntryOutcome, FailureReason, FileSystem};
use seedlink_match::{LinkPlan, PlannedLink};

use crate::OPERATION_CHANNEL_SIZE;
use crate::executor::run_all;
use crate::progress::LinkProgress;

/// Options for materializing a plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaterializeOptions {
    /// Run all checks without touching the filesystem.
    pub dry_run: bool,
    /// Maximum number of entries processed at once.
    pub max_concurrent: usize,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrent: 16,
        }
    }
}

/// Outcome of one planned link, tagged with its manifest position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Position of the entry in the manifest.
    pub index: usize,
    /// What happened.
    pub outcome: EntryOutcome,
}

/// Event sent through the channel during materialization.
#[derive(Debug)]
pub enum MaterializeEvent {
    /// An entry finished.
    Progress(LinkProgress),
    /// Every entry finished. Records are in manifest order.
    Complete(Vec<LinkRecord>),
}

/// Directories known to exist at the destination.
///
/// Shared across concurrent entries so each parent is created once.
#[derive(Debug, Default)]
pub struct EnsuredDirs {
    known: DashSet<PathBuf>,
}

impl EnsuredDirs {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `dir` and its parents unless already done.
    pub fn ensure(&self, fs: &dyn FileSystem, dir: &Path) -> std::io::Result<()> {
        if self.known.contains(dir) {
            return Ok(());
        }
        fs.create_dir_all(dir)?;
        self.known.insert(dir.to_path_buf());
        Ok(())
    }

    /// Number of directories ensured.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Check if no directory was ensured.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// Process one planned link.
pub fn link_one(
    fs: &dyn FileSystem,
    link: &PlannedLink,
    dry_run: bool,
    dirs: &EnsuredDirs,
) -> Disposition {
    if !dry_run {
        if let Some(parent) = link.destination.parent() {
            if let Err(e) = dirs.ensure(fs, parent) {
                return Disposition::Failed {
                    reason: FailureReason::CreateDirectory {
                        path: parent.to_path_buf(),
                        message: e.to_string(),
                    },
                };
            }
        }
    }

    if !fs.exists(&link.source) {
        return Disposition::Failed {
            reason: FailureReason::SourceMissing {
                source: link.source.clone(),
            },
        };
    }

    if fs.occupied(&link.destination) {
        return Disposition::Failed {
            reason: FailureReason::DestinationExists {
                destination: link.destination.clone(),
            },
        };
    }

    if dry_run {
        info!(
            "Would symlink: {} => {}",
            link.destination.display(),
            link.source.display()
        );
        return Disposition::Skipped {
            source: link.source.clone(),
        };
    }

    match fs.symlink(&link.source, &link.destination) {
        Ok(()) => {
            info!(
                "Symlink created: {} => {}",
                link.destination.display(),
                link.source.display()
            );
            Disposition::Linked {
                source: link.source.clone(),
            }
        }
        Err(e) => Disposition::Failed {
            reason: FailureReason::CreateLink {
                message: e.to_string(),
            },
        },
    }
}

/// Start materializing a plan in the background.
///
/// Emits a [`MaterializeEvent::Progress`] per finished entry and a final
/// [`MaterializeEvent::Complete`].
pub fn start_materialize(
    fs: Arc<dyn FileSystem>,
    plan: LinkPlan,
    options: MaterializeOptions,
) -> mpsc::Receiver<MaterializeEvent> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        let records = materialize_impl(fs, plan, options, &tx).await;
        let _ = tx.send(MaterializeEvent::Complete(records)).await;
    });

    rx
}

/// Materialize a plan and wait for every entry.
pub async fn materialize(
    fs: Arc<dyn FileSystem>,
    plan: LinkPlan,
    options: MaterializeOptions,
) -> Vec<LinkRecord> {
    let mut rx = start_materialize(fs, plan, options);
    while let Some(event) = rx.recv().await {
        match event {
            MaterializeEvent::Progress(progress) => {
                debug!(
                    completed = progress.completed,
                    total = progress.total,
                    "Materialize progress"
                );
            }
            MaterializeEvent::Complete(records) => return records,
        }
    }
    Vec::new()
}

async fn materialize_impl(
    fs: Arc<dyn FileSystem>,
    plan: LinkPlan,
    options: MaterializeOptions,
    tx: &mpsc::Sender<MaterializeEvent>,
) -> Vec<LinkRecord> {
    let links = plan.links;
    let dirs = Arc::new(EnsuredDirs::new());
    let dry_run = options.dry_run;
    let mut progress = LinkProgress::new(links.len());

    let job = move |link: PlannedLink| {
        let disposition = link_one(fs.as_ref(), &link, dry_run, &dirs);
        if let Disposition::Failed { reason } = &disposition {
            warn!(destination = %link.destination.display(), "Cannot link: {reason}");
        }
        LinkRecord {
            index: link.index,
            outcome: EntryOutcome::new(link.entry, link.destination, disposition),
        }
    };

    let results = run_all(links.clone(), options.max_concurrent, job, |_, result| {
        if let Ok(record) = result {
            progress.record(record.outcome.destination.clone(), &record.outcome.disposition);
            let _ = tx.try_send(MaterializeEvent::Progress(progress.clone()));
        }
    })
    .await;

    let mut records: Vec<LinkRecord> = results
        .into_iter()
        .filter_map(|(position, result)| match result {
            Ok(record) => Some(record),
            Err(message) => links.get(position).map(|link| LinkRecord {
                index: link.index,
                outcome: EntryOutcome::new(
                    link.entry.clone(),
                    link.destination.clone(),
                    Disposition::Failed {
                        reason: FailureReason::TaskFailed { message },
                    },
                ),
            }),
        })
        .collect();
    records.sort_by_key(|r| r.index);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedlink_core::{LocalFs, ManifestEntry};
    use tempfile::TempDir;

    fn planned(index: usize, source: PathBuf, destination: PathBuf) -> PlannedLink {
        PlannedLink {
            index,
            entry: ManifestEntry::new(format!("e{index}"), 1),
            source,
            destination,
        }
    }

    #[test]
    fn test_link_one_creates_parents() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.bin");
        std::fs::write(&source, "x").unwrap();
        let destination = temp.path().join("out/a/b/dst.bin");

        let dirs = EnsuredDirs::new();
        let disposition = link_one(
            &LocalFs::new(),
            &planned(0, source.clone(), destination.clone()),
            false,
            &dirs,
        );

        assert_eq!(disposition, Disposition::Linked { source: source.clone() });
        assert_eq!(std::fs::read_link(&destination).unwrap(), source);
        assert_eq!(dirs.len(), 1);
    }

    #[test]
    fn test_link_one_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.bin");
        let destination = temp.path().join("dst.bin");
        std::fs::write(&source, "new").unwrap();
        std::fs::write(&destination, "old").unwrap();

        let disposition = link_one(
            &LocalFs::new(),
            &planned(0, source, destination.clone()),
            false,
            &EnsuredDirs::new(),
        );

        assert!(matches!(
            disposition,
            Disposition::Failed {
                reason: FailureReason::DestinationExists { .. }
            }
        ));
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "old");
    }

    #[test]
    fn test_link_one_dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.bin");
        std::fs::write(&source, "x").unwrap();
        let destination = temp.path().join("out/dst.bin");

        let dirs = EnsuredDirs::new();
        let disposition = link_one(
            &LocalFs::new(),
            &planned(0, source.clone(), destination),
            true,
            &dirs,
        );

        assert_eq!(disposition, Disposition::Skipped { source });
        assert!(!temp.path().join("out").exists());
        assert!(dirs.is_empty());
    }

    #[test]
    fn test_link_one_missing_source() {
        let temp = TempDir::new().unwrap();
        let disposition = link_one(
            &LocalFs::new(),
            &planned(0, temp.path().join("gone"), temp.path().join("dst")),
            true,
            &EnsuredDirs::new(),
        );

        assert!(matches!(
            disposition,
            Disposition::Failed {
                reason: FailureReason::SourceMissing { .. }
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_materialize_reports_progress() {
        let temp = TempDir::new().unwrap();
        let mut links = Vec::new();
        for i in 0..3 {
            let source = temp.path().join(format!("s{i}"));
            std::fs::write(&source, "x").unwrap();
            links.push(planned(i, source, temp.path().join(format!("d/{i}"))));
        }

        let mut rx = start_materialize(
            Arc::new(LocalFs::new()),
            LinkPlan { links },
            MaterializeOptions::default(),
        );

        let mut progress_events = 0;
        let mut records = None;
        while let Some(event) = rx.recv().await {
            match event {
                MaterializeEvent::Progress(_) => progress_events += 1,
                MaterializeEvent::Complete(r) => records = Some(r),
            }
        }

        let records = records.unwrap();
        assert_eq!(progress_events, 3);
        assert_eq!(
            records.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(records
            .iter()
            .all(|r| matches!(r.outcome.disposition, Disposition::Linked { .. })));
    }
}
