use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use seedlink_scan::{FileSystem, LocalFs, TreeWalker, WalkConfig, WalkError};
use seedlink_core::FileStat;
use tempfile::TempDir;

/// Local filesystem that refuses to list one directory.
struct FailingFs {
    inner: LocalFs,
    broken: PathBuf,
    reads: AtomicUsize,
    failed: AtomicBool,
    reads_after_failure: AtomicUsize,
}

impl FailingFs {
    fn new(broken: PathBuf) -> Self {
        Self {
            inner: LocalFs::new(),
            broken,
            reads: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            reads_after_failure: AtomicUsize::new(0),
        }
    }
}

impl FileSystem for FailingFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failed.load(Ordering::SeqCst) {
            self.reads_after_failure.fetch_add(1, Ordering::SeqCst);
        }
        if path == self.broken {
            self.failed.store(true, Ordering::SeqCst);
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        self.inner.read_dir(path)
    }

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.metadata(path)
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.symlink_metadata(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()> {
        self.inner.symlink(original, link)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        self.inner.copy(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_file(path)
    }
}

fn seeded_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    for dir in ["ok/a", "ok/b", "locked/inner"] {
        std::fs::create_dir_all(temp.path().join(dir)).unwrap();
    }
    std::fs::write(temp.path().join("ok/a/one.bin"), vec![0u8; 100]).unwrap();
    std::fs::write(temp.path().join("ok/b/two.bin"), vec![0u8; 200]).unwrap();
    std::fs::write(temp.path().join("locked/inner/three.bin"), vec![0u8; 300]).unwrap();
    temp
}

#[test]
fn test_directory_failure_discards_inventory() {
    let temp = seeded_tree();
    let root = std::path::absolute(temp.path()).unwrap();
    let fs = Arc::new(FailingFs::new(root.join("locked")));

    let walker = TreeWalker::with_fs(fs);
    let err = walker.walk(&WalkConfig::new(&root)).unwrap_err();

    match err {
        WalkError::PermissionDenied { path } => assert_eq!(path, root.join("locked")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_directory_failure_stops_further_reads() {
    const SIBLINGS: usize = 600;
    const THREADS: usize = 2;

    let temp = TempDir::new().unwrap();
    let root = std::path::absolute(temp.path()).unwrap();
    std::fs::create_dir(root.join("bad")).unwrap();
    for i in 0..SIBLINGS {
        let dir = root.join(format!("d{i:03}/inner"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("f.bin"), "x").unwrap();
    }

    let fs = Arc::new(FailingFs::new(root.join("bad")));
    let config = WalkConfig::builder()
        .root(&root)
        .threads(THREADS)
        .build()
        .unwrap();
    let err = TreeWalker::with_fs(fs.clone()).walk(&config).unwrap_err();

    match err {
        WalkError::PermissionDenied { path } => assert_eq!(path, root.join("bad")),
        other => panic!("unexpected error: {other}"),
    }
    // Only reads already past the cancellation check may still land.
    assert!(fs.reads_after_failure.load(Ordering::SeqCst) <= THREADS);
    // root + bad + two reads per sibling when nothing is cancelled
    assert!(fs.reads.load(Ordering::SeqCst) <= 2 + 2 * SIBLINGS);
}

#[test]
fn test_walker_is_reusable_after_failure() {
    let temp = seeded_tree();
    let root = std::path::absolute(temp.path()).unwrap();
    let walker = TreeWalker::with_fs(Arc::new(FailingFs::new(root.join("locked"))));

    assert!(walker.walk(&WalkConfig::new(&root)).is_err());

    let config = WalkConfig::builder()
        .root(&root)
        .ignore_patterns(vec!["locked".to_string()])
        .build()
        .unwrap();
    let entries = walker.walk(&config).unwrap();
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_sizes_and_paths_through_custom_fs() {
    let temp = seeded_tree();
    let root = std::path::absolute(temp.path()).unwrap();
    let fs = Arc::new(FailingFs::new(root.join("does-not-exist")));

    let entries = TreeWalker::with_fs(fs.clone())
        .walk(&WalkConfig::new(&root))
        .unwrap();

    let mut sizes: Vec<u64> = entries.iter().map(|e| e.size).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![100, 200, 300]);
    assert!(entries.iter().all(|e| e.path.starts_with(&root)));
    // root, ok, ok/a, ok/b, locked, locked/inner
    assert_eq!(fs.reads.load(Ordering::SeqCst), 6);
}

#[test]
fn test_repeated_walks_agree() {
    let temp = seeded_tree();
    let walker = TreeWalker::new();
    let config = WalkConfig::new(temp.path());

    let first = walker.walk(&config).unwrap();
    let second = walker.walk(&config).unwrap();
    assert_eq!(first, second);
}
