//! Directory identity tracking for link-following walks.

use dashmap::DashSet;
use seedlink_core::FileStat;

/// Identity of a directory on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId {
    pub device: u64,
    pub inode: u64,
}

impl From<&FileStat> for DirId {
    fn from(stat: &FileStat) -> Self {
        Self {
            device: stat.device,
            inode: stat.inode,
        }
    }
}

/// Tracks directories already entered so symlink cycles terminate.
///
/// Shared by every branch of a walk; uses a concurrent set so sibling
/// tasks can record entries without locking each other out.
#[derive(Debug, Default)]
pub struct VisitedDirs {
    seen: DashSet<DirId>,
}

impl VisitedDirs {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Record a directory. Returns `true` the first time it is seen.
    ///
    /// Directories without an inode number (platforms that do not report
    /// one) are always treated as new.
    pub fn enter(&self, stat: &FileStat) -> bool {
        if stat.inode == 0 {
            return true;
        }
        self.seen.insert(DirId::from(stat))
    }

    /// Get the number of directories recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedlink_core::FileKind;

    fn dir(device: u64, inode: u64) -> FileStat {
        FileStat {
            size: 4096,
            kind: FileKind::Directory,
            device,
            inode,
        }
    }

    #[test]
    fn test_enter_once() {
        let visited = VisitedDirs::new();
        assert!(visited.enter(&dir(1, 42)));
        assert!(!visited.enter(&dir(1, 42)));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_different_devices() {
        let visited = VisitedDirs::new();
        assert!(visited.enter(&dir(1, 42)));
        assert!(visited.enter(&dir(2, 42)));
    }

    #[test]
    fn test_unknown_inode_always_new() {
        let visited = VisitedDirs::new();
        assert!(visited.enter(&dir(0, 0)));
        assert!(visited.enter(&dir(0, 0)));
        assert!(visited.is_empty());
    }
}
