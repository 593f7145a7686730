//! Walk progress reporting.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress information during a walk.
#[derive(Debug, Clone)]
pub struct WalkProgress {
    /// Number of files found so far.
    pub files_found: u64,
    /// Number of directories read so far.
    pub dirs_visited: u64,
    /// Total bytes of the files found so far.
    pub bytes_found: u64,
    /// Most recently found file.
    pub current_path: PathBuf,
    /// Time elapsed since the walk started.
    pub elapsed: Duration,
}

impl WalkProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_found: 0,
            dirs_visited: 0,
            bytes_found: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate walk rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_found as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for WalkProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock-free counters shared by all branches of a walk.
///
/// Announces progress when the file count reaches `base`, `base^2`, ...
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_found: AtomicU64,
    dirs_visited: AtomicU64,
    bytes_found: AtomicU64,
    next_announce: AtomicU64,
    base: u64,
}

impl ProgressTracker {
    pub fn new(base: u64) -> Self {
        let base = base.max(2);
        Self {
            start_time: Instant::now(),
            files_found: AtomicU64::new(0),
            dirs_visited: AtomicU64::new(0),
            bytes_found: AtomicU64::new(0),
            next_announce: AtomicU64::new(base),
            base,
        }
    }

    pub fn record_dir(&self) {
        self.dirs_visited.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file. Returns the crossed threshold when one was reached.
    pub fn record_file(&self, size: u64) -> Option<u64> {
        let files = self.files_found.fetch_add(1, Ordering::Relaxed) + 1;
        self.bytes_found.fetch_add(size, Ordering::Relaxed);

        let threshold = self.next_announce.load(Ordering::Relaxed);
        if files < threshold {
            return None;
        }
        self.next_announce
            .compare_exchange(
                threshold,
                threshold.saturating_mul(self.base),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .ok()
    }

    pub fn files_found(&self) -> u64 {
        self.files_found.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, current_path: PathBuf) -> WalkProgress {
        WalkProgress {
            files_found: self.files_found.load(Ordering::Relaxed),
            dirs_visited: self.dirs_visited.load(Ordering::Relaxed),
            bytes_found: self.bytes_found.load(Ordering::Relaxed),
            current_path,
            elapsed: self.start_time.elapsed(),
        }
    }
}
