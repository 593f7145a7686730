//! Run orchestration: walk, match, claim, materialize, summarize.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use seedlink_core::{
    Disposition, EntryOutcome, FailureReason, FileSystem, InventoryEntry, LinkConfig, LocalFs,
    Manifest, RunError, RunReport, RunSummary, WalkConfig,
};
use seedlink_match::{Resolution, SizeMatcher, resolve};
use seedlink_scan::TreeWalker;

use crate::materialize::{LinkRecord, MaterializeOptions, materialize};
use crate::relocate::relocate;

/// Sequences the walker, matcher and materializer for one run.
///
/// Only structural problems are errors: a missing root, an unloadable
/// manifest or a failed walk. Everything that goes wrong for a single entry
/// ends up in the returned summaries.
pub struct Orchestrator {
    config: LinkConfig,
    fs: Arc<dyn FileSystem>,
    walker: Arc<TreeWalker>,
}

impl Orchestrator {
    /// Create an orchestrator over the local filesystem.
    pub fn new(config: LinkConfig) -> Self {
        Self::with_fs(config, Arc::new(LocalFs::new()))
    }

    /// Create an orchestrator over a custom filesystem.
    pub fn with_fs(config: LinkConfig, fs: Arc<dyn FileSystem>) -> Self {
        let walker = Arc::new(TreeWalker::with_fs(Arc::clone(&fs)));
        Self { config, fs, walker }
    }

    /// The run configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Walker used for the source tree, for progress subscriptions.
    pub fn walker(&self) -> &TreeWalker {
        &self.walker
    }

    /// Resolve both roots to absolute paths and check they are directories.
    pub fn check_roots(&self) -> Result<(PathBuf, PathBuf), RunError> {
        let source = self.check_dir(&self.config.source_root)?;
        let destination = self.check_dir(&self.config.destination_root)?;
        Ok((source, destination))
    }

    fn check_dir(&self, path: &Path) -> Result<PathBuf, RunError> {
        let missing = || RunError::MissingDirectory {
            path: path.to_path_buf(),
        };
        let absolute = std::path::absolute(path).map_err(|_| missing())?;
        match self.fs.metadata(&absolute) {
            Ok(stat) if stat.is_dir() => Ok(absolute),
            _ => Err(missing()),
        }
    }

    /// Load every manifest, failing on the first unreadable one.
    pub fn load_manifests(paths: &[PathBuf]) -> Result<Vec<Manifest>, RunError> {
        paths
            .iter()
            .map(|path| Manifest::from_path(path).map_err(RunError::from))
            .collect()
    }

    /// Walk the source tree on the blocking pool.
    pub async fn inventory<F>(&self, config: WalkConfig, filter: F) -> Result<Vec<InventoryEntry>, RunError>
    where
        F: Fn(&InventoryEntry) -> bool + Send + Sync + 'static,
    {
        let walker = Arc::clone(&self.walker);
        tokio::task::spawn_blocking(move || walker.walk_filtered(&config, filter))
            .await
            .map_err(|e| RunError::Task {
                message: e.to_string(),
            })?
            .map_err(RunError::from)
    }

    /// Load manifests from disk, then run.
    pub async fn run_files(&self, manifest_paths: &[PathBuf]) -> Result<RunReport, RunError> {
        let manifests = Self::load_manifests(manifest_paths)?;
        self.run(&manifests).await
    }

    /// Reconcile every manifest against one walk of the source tree.
    ///
    /// Every manifest is validated before anything is walked or linked.
    pub async fn run(&self, manifests: &[Manifest]) -> Result<RunReport, RunError> {
        for manifest in manifests {
            manifest.validate()?;
        }
        let (source_root, destination_root) = self.check_roots()?;

        let mut walk_config = self.config.walk_config();
        walk_config.root = source_root;
        let inventory = self.inventory(walk_config, |_| true).await?;
        info!("Walked source directory, found {} file(s)", inventory.len());

        let matcher = SizeMatcher::new(&inventory);
        let mut summaries = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            summaries.push(self.link_manifest(manifest, &matcher, &destination_root).await);
        }

        Ok(RunReport {
            summaries,
            inventory_size: inventory.len(),
            dry_run: self.config.dry_run,
        })
    }

    /// Match, claim and materialize a single manifest.
    pub async fn link_manifest(
        &self,
        manifest: &Manifest,
        matcher: &SizeMatcher,
        destination_root: &Path,
    ) -> RunSummary {
        info!(
            "Processing manifest {} ({} files)",
            manifest.name,
            manifest.len()
        );

        let report = matcher.match_entries(&manifest.entries);
        let resolution = resolve(&report, destination_root);
        info!(
            "Found matches for {}/{} files",
            resolution.plan.len(),
            manifest.len()
        );

        let options = MaterializeOptions {
            dry_run: self.config.dry_run,
            max_concurrent: self.config.max_concurrent,
        };
        let records = if resolution.plan.is_empty() {
            Vec::new()
        } else {
            materialize(Arc::clone(&self.fs), resolution.plan.clone(), options).await
        };

        let summary = assemble(manifest, resolution, records);
        info!("{}: {}", summary.manifest, summary.counts);
        summary
    }

    /// Move every non-symlink file under the source root into the
    /// destination root and leave symlinks behind.
    pub async fn relocate(&self) -> Result<RunSummary, RunError> {
        let (source_root, destination_root) = self.check_roots()?;

        let mut walk_config = self.config.walk_config();
        walk_config.root = source_root;
        let inventory = self.inventory(walk_config, |e| !e.is_symlink).await?;
        info!("Found {} file(s) to relocate", inventory.len());

        let summary = relocate(
            Arc::clone(&self.fs),
            inventory,
            &destination_root,
            self.config.dry_run,
            self.config.max_concurrent,
        )
        .await;
        info!("{}", summary.counts);
        Ok(summary)
    }
}

/// Merge rejected entries and link records back into manifest order.
fn assemble(manifest: &Manifest, resolution: Resolution, records: Vec<LinkRecord>) -> RunSummary {
    let mut slots: Vec<Option<EntryOutcome>> = vec![None; manifest.len()];

    for rejection in resolution.rejected {
        if let Some(slot) = slots.get_mut(rejection.index) {
            *slot = Some(rejection.outcome);
        }
    }
    for record in records {
        if let Some(slot) = slots.get_mut(record.index) {
            *slot = Some(record.outcome);
        }
    }
    for link in resolution.plan.links {
        if let Some(slot @ None) = slots.get_mut(link.index) {
            *slot = Some(EntryOutcome::new(
                link.entry,
                link.destination,
                Disposition::Failed {
                    reason: FailureReason::TaskFailed {
                        message: "no result recorded".to_string(),
                    },
                },
            ));
        }
    }

    RunSummary::new(manifest.name.clone(), slots.into_iter().flatten().collect())
}
