//! Seed-and-relocate: move seeded files into a new tree and leave symlinks
//! behind at their original location.
//!
//! Files that are already symbolic links are never offered to this module
//! (the orchestrator walks with a filter that drops them), so running it a
//! second time over the same seed directory is a no-op.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use seedlink_core::{
    Disposition, EntryOutcome, FailureReason, FileSystem, InventoryEntry, ManifestEntry,
    RunSummary,
};

use crate::executor::run_all;
use crate::materialize::EnsuredDirs;

/// One file to relocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocateItem {
    /// Relative path and size of the file.
    pub entry: ManifestEntry,
    /// Current location; becomes a symlink.
    pub original: PathBuf,
    /// New location of the real file.
    pub destination: PathBuf,
}

impl RelocateItem {
    /// Build an item for an inventory entry.
    pub fn new(inventory: &InventoryEntry, destination_root: &Path) -> Self {
        Self {
            entry: ManifestEntry::new(&inventory.relative_path, inventory.size),
            original: inventory.path.clone(),
            destination: destination_root.join(&inventory.relative_path),
        }
    }
}

/// Relocate one file.
///
/// Reports `Linked { source }` with `source` being the original path, which
/// now points at `item.destination`.
pub fn relocate_one(
    fs: &dyn FileSystem,
    item: &RelocateItem,
    dry_run: bool,
    dirs: &EnsuredDirs,
) -> Disposition {
    let failed = |reason| Disposition::Failed { reason };

    if !dry_run {
        if let Some(parent) = item.destination.parent() {
            if let Err(e) = dirs.ensure(fs, parent) {
                return failed(FailureReason::CreateDirectory {
                    path: parent.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }

    if !fs.exists(&item.original) {
        return failed(FailureReason::SourceMissing {
            source: item.original.clone(),
        });
    }

    if fs.occupied(&item.destination) {
        return failed(FailureReason::DestinationExists {
            destination: item.destination.clone(),
        });
    }

    if dry_run {
        info!(
            "Would move: {} => {} and symlink it back",
            item.original.display(),
            item.destination.display()
        );
        return Disposition::Skipped {
            source: item.original.clone(),
        };
    }

    if let Err(e) = fs.copy(&item.original, &item.destination) {
        let _ = fs.remove_file(&item.destination);
        return failed(FailureReason::Copy {
            message: e.to_string(),
        });
    }

    if let Err(e) = fs.remove_file(&item.original) {
        // Original is still in place; drop the copy so nothing is duplicated.
        let _ = fs.remove_file(&item.destination);
        return failed(FailureReason::RemoveSource {
            message: e.to_string(),
        });
    }

    if let Err(e) = fs.symlink(&item.destination, &item.original) {
        return failed(FailureReason::CreateLink {
            message: e.to_string(),
        });
    }

    info!(
        "Relocated: {} => {}",
        item.original.display(),
        item.destination.display()
    );
    Disposition::Linked {
        source: item.original.clone(),
    }
}

/// Relocate every inventory entry into `destination_root`.
///
/// Outcomes follow inventory order.
pub async fn relocate(
    fs: Arc<dyn FileSystem>,
    inventory: Vec<InventoryEntry>,
    destination_root: &Path,
    dry_run: bool,
    max_concurrent: usize,
) -> RunSummary {
    let items: Vec<RelocateItem> = inventory
        .iter()
        .map(|entry| RelocateItem::new(entry, destination_root))
        .collect();
    let dirs = Arc::new(EnsuredDirs::new());

    let job = move |item: RelocateItem| {
        let disposition = relocate_one(fs.as_ref(), &item, dry_run, &dirs);
        if let Disposition::Failed { reason } = &disposition {
            warn!(path = %item.original.display(), "Cannot relocate: {reason}");
        }
        EntryOutcome::new(item.entry, item.destination, disposition)
    };

    let results = run_all(items.clone(), max_concurrent, job, |_, _| {}).await;
    let outcomes = collect_outcomes(&items, results);

    RunSummary::new("relocate", outcomes)
}

/// Put results back in inventory order. Items with no result, or whose task
/// died, are reported as `TaskFailed`.
fn collect_outcomes(
    items: &[RelocateItem],
    results: Vec<(usize, Result<EntryOutcome, String>)>,
) -> Vec<EntryOutcome> {
    let mut slots: Vec<Option<Result<EntryOutcome, String>>> = vec![None; items.len()];
    for (position, result) in results {
        if let Some(slot) = slots.get_mut(position) {
            *slot = Some(result);
        }
    }

    items
        .iter()
        .zip(slots)
        .map(|(item, slot)| match slot {
            Some(Ok(outcome)) => outcome,
            Some(Err(message)) => task_failed(item, message),
            None => task_failed(item, "no result recorded".to_string()),
        })
        .collect()
}

fn task_failed(item: &RelocateItem, message: String) -> EntryOutcome {
    EntryOutcome::new(
        item.entry.clone(),
        item.destination.clone(),
        Disposition::Failed {
            reason: FailureReason::TaskFailed { message },
        },
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use seedlink_core::LocalFs;
    use tempfile::TempDir;

    fn item(seed: &Path, dest: &Path, relative: &str, contents: &str) -> RelocateItem {
        let original = seed.join(relative);
        std::fs::create_dir_all(original.parent().unwrap()).unwrap();
        std::fs::write(&original, contents).unwrap();
        RelocateItem::new(
            &InventoryEntry::new(&original, relative, contents.len() as u64),
            dest,
        )
    }

    #[test]
    fn test_relocate_one_moves_and_links_back() {
        let seed = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let item = item(seed.path(), dest.path(), "show/ep1.mkv", "payload");

        let disposition = relocate_one(&LocalFs::new(), &item, false, &EnsuredDirs::new());

        assert_eq!(
            disposition,
            Disposition::Linked {
                source: item.original.clone()
            }
        );
        assert_eq!(std::fs::read_to_string(&item.destination).unwrap(), "payload");
        assert_eq!(std::fs::read_link(&item.original).unwrap(), item.destination);
    }

    #[test]
    fn test_relocate_one_dry_run() {
        let seed = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let item = item(seed.path(), dest.path(), "a/b.bin", "x");

        let disposition = relocate_one(&LocalFs::new(), &item, true, &EnsuredDirs::new());

        assert!(matches!(disposition, Disposition::Skipped { .. }));
        assert!(!dest.path().join("a").exists());
        assert!(!std::fs::symlink_metadata(&item.original)
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[test]
    fn test_relocate_one_keeps_existing_destination() {
        let seed = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let item = item(seed.path(), dest.path(), "c.bin", "new");
        std::fs::write(&item.destination, "old").unwrap();

        let disposition = relocate_one(&LocalFs::new(), &item, false, &EnsuredDirs::new());

        assert!(matches!(
            disposition,
            Disposition::Failed {
                reason: FailureReason::DestinationExists { .. }
            }
        ));
        assert_eq!(std::fs::read_to_string(&item.destination).unwrap(), "old");
        assert_eq!(std::fs::read_to_string(&item.original).unwrap(), "new");
    }

    #[test]
    fn test_collect_outcomes_fills_lost_positions() {
        let items: Vec<RelocateItem> = ["a", "b", "c"]
            .iter()
            .map(|name| {
                RelocateItem::new(
                    &InventoryEntry::new(format!("/seed/{name}"), *name, 1),
                    Path::new("/dest"),
                )
            })
            .collect();
        let linked = |item: &RelocateItem| {
            EntryOutcome::new(
                item.entry.clone(),
                item.destination.clone(),
                Disposition::Linked {
                    source: item.original.clone(),
                },
            )
        };

        // Completion order, one panic, one position never reported.
        let results = vec![(2, Ok(linked(&items[2]))), (0, Err("panicked".to_string()))];
        let outcomes = collect_outcomes(&items, results);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0].disposition,
            Disposition::Failed {
                reason: FailureReason::TaskFailed {
                    message: "panicked".to_string()
                }
            }
        );
        assert!(matches!(
            &outcomes[1].disposition,
            Disposition::Failed {
                reason: FailureReason::TaskFailed { .. }
            }
        ));
        assert_eq!(outcomes[1].destination, PathBuf::from("/dest/b"));
        assert_eq!(outcomes[2], linked(&items[2]));
    }
}
