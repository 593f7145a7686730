//! Concurrent recursive directory walker.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use seedlink_core::{FileSystem, InventoryEntry, LocalFs, WalkConfig, WalkError};

use crate::progress::{ProgressTracker, WalkProgress};
use crate::visited::VisitedDirs;

/// Walks a source tree into a flat inventory, fanning out one rayon task
/// per directory entry.
///
/// The walk is all-or-nothing. The first directory or stat failure cancels
/// every outstanding branch and is returned as the error; nothing found so
/// far is reported.
pub struct TreeWalker {
    fs: Arc<dyn FileSystem>,
    progress_tx: broadcast::Sender<WalkProgress>,
    cancel: CancellationToken,
}

/// Marker for a branch that stopped because the walk was aborted.
struct Aborted;

struct WalkContext<'a, F> {
    fs: &'a dyn FileSystem,
    config: &'a WalkConfig,
    root: &'a Path,
    ignore: GlobSet,
    filter: F,
    visited: VisitedDirs,
    progress: ProgressTracker,
    progress_tx: &'a broadcast::Sender<WalkProgress>,
    token: CancellationToken,
    first_error: OnceLock<WalkError>,
}

impl<F> WalkContext<'_, F> {
    fn check(&self) -> Result<(), Aborted> {
        if self.token.is_cancelled() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    fn fail(&self, error: WalkError) -> Aborted {
        if self.first_error.set(error).is_ok() {
            self.token.cancel();
        }
        Aborted
    }

    fn record_file(&self, entry: &InventoryEntry) {
        if let Some(threshold) = self.progress.record_file(entry.size) {
            info!("Walking found {threshold} files");
            let _ = self
                .progress_tx
                .send(self.progress.snapshot(entry.path.clone()));
        }
    }

    fn into_error(self) -> WalkError {
        self.first_error.into_inner().unwrap_or(WalkError::Cancelled)
    }
}

impl TreeWalker {
    /// Create a walker over the local filesystem.
    pub fn new() -> Self {
        Self::with_fs(Arc::new(LocalFs::new()))
    }

    /// Create a walker over a custom filesystem.
    pub fn with_fs(fs: Arc<dyn FileSystem>) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            fs,
            progress_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to walk progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<WalkProgress> {
        self.progress_tx.subscribe()
    }

    /// Token that aborts any walk in progress when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Walk the configured root and return every non-directory entry.
    pub fn walk(&self, config: &WalkConfig) -> Result<Vec<InventoryEntry>, WalkError> {
        self.walk_filtered(config, |_| true)
    }

    /// Walk the configured root, keeping only entries accepted by `filter`.
    ///
    /// The filter sees each entry after its metadata has been read, so it
    /// can reject symbolic links or sizes without affecting traversal.
    pub fn walk_filtered<F>(
        &self,
        config: &WalkConfig,
        filter: F,
    ) -> Result<Vec<InventoryEntry>, WalkError>
    where
        F: Fn(&InventoryEntry) -> bool + Sync,
    {
        let root = std::path::absolute(&config.root).map_err(|e| WalkError::io(&config.root, e))?;
        let root_stat = self
            .fs
            .metadata(&root)
            .map_err(|e| WalkError::io(&root, e))?;
        if !root_stat.is_dir() {
            return Err(WalkError::NotADirectory { path: root });
        }

        let ctx = WalkContext {
            fs: self.fs.as_ref(),
            config,
            root: &root,
            ignore: build_ignore_set(&config.ignore_patterns)?,
            filter,
            visited: VisitedDirs::new(),
            progress: ProgressTracker::new(config.progress_base),
            progress_tx: &self.progress_tx,
            token: self.cancel.child_token(),
            first_error: OnceLock::new(),
        };
        if config.follow_symlinks {
            ctx.visited.enter(&root_stat);
        }

        info!(root = %root.display(), "Walking source directory");

        let result = match config.threads {
            0 => self.walk_dir(&ctx, &root),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| WalkError::InvalidConfig {
                        message: e.to_string(),
                    })?;
                pool.install(|| self.walk_dir(&ctx, &root))
            }
        };

        match result {
            Ok(mut entries) => {
                entries.sort_by(|a, b| a.path.cmp(&b.path));
                let progress = ctx.progress.snapshot(root.clone());
                info!(
                    files = progress.files_found,
                    dirs = progress.dirs_visited,
                    bytes = progress.bytes_found,
                    "Walk complete"
                );
                let _ = self.progress_tx.send(progress);
                Ok(entries)
            }
            Err(Aborted) => {
                let error = ctx.into_error();
                warn!("Walk aborted: {error}");
                Err(error)
            }
        }
    }

    /// Read one directory and fan out over its entries.
    fn walk_dir<F>(&self, ctx: &WalkContext<'_, F>, dir: &Path) -> Result<Vec<InventoryEntry>, Aborted>
    where
        F: Fn(&InventoryEntry) -> bool + Sync,
    {
        ctx.check()?;
        let children = ctx
            .fs
            .read_dir(dir)
            .map_err(|e| ctx.fail(WalkError::io(dir, e)))?;
        ctx.progress.record_dir();

        children
            .into_par_iter()
            .map(|child| self.visit(ctx, child))
            .try_reduce(Vec::new, |mut acc, mut batch| {
                acc.append(&mut batch);
                Ok(acc)
            })
    }

    /// Classify one entry: recurse into directories, record everything else.
    fn visit<F>(&self, ctx: &WalkContext<'_, F>, path: PathBuf) -> Result<Vec<InventoryEntry>, Aborted>
    where
        F: Fn(&InventoryEntry) -> bool + Sync,
    {
        ctx.check()?;

        if let Some(name) = path.file_name().map(|n| n.to_string_lossy()) {
            if ctx.config.should_skip_hidden(&name) || ctx.ignore.is_match(&*name) {
                return Ok(Vec::new());
            }
        }

        let link_stat = ctx
            .fs
            .symlink_metadata(&path)
            .map_err(|e| ctx.fail(WalkError::io(&path, e)))?;
        let is_symlink = link_stat.is_symlink();

        let stat = if is_symlink && ctx.config.follow_symlinks {
            match ctx.fs.metadata(&path) {
                Ok(target) => target,
                Err(e) => {
                    warn!(path = %path.display(), "Broken symlink: {e}");
                    link_stat
                }
            }
        } else {
            link_stat
        };

        if stat.is_dir() {
            if ctx.config.follow_symlinks && !ctx.visited.enter(&stat) {
                debug!(path = %path.display(), "Directory already visited, skipping");
                return Ok(Vec::new());
            }
            return self.walk_dir(ctx, &path);
        }

        let relative = path
            .strip_prefix(ctx.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        let mut entry = InventoryEntry::new(path, relative, stat.size);
        entry.is_symlink = is_symlink;

        if !(ctx.filter)(&entry) {
            return Ok(Vec::new());
        }

        ctx.record_file(&entry);
        Ok(vec![entry])
    }
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new()
    }
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, WalkError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| WalkError::InvalidConfig {
            message: format!("invalid ignore pattern {pattern:?}: {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| WalkError::InvalidConfig {
        message: e.to_string(),
    })
}
