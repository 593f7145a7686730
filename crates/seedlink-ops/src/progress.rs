//! Progress reporting types for link operations.

use std::path::PathBuf;

use seedlink_core::Disposition;

/// Progress information for an ongoing materialization.
#[derive(Debug, Clone)]
pub struct LinkProgress {
    /// Number of planned entries finished.
    pub completed: usize,
    /// Total number of planned entries.
    pub total: usize,
    /// Links created (or that a dry-run would create).
    pub succeeded: usize,
    /// Entries that failed.
    pub failed: usize,
    /// Destination of the entry that just finished.
    pub current: Option<PathBuf>,
}

impl LinkProgress {
    /// Create a new progress tracker.
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
            succeeded: 0,
            failed: 0,
            current: None,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.completed as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Record a finished entry.
    pub fn record(&mut self, destination: PathBuf, disposition: &Disposition) {
        self.completed += 1;
        match disposition {
            Disposition::Failed { .. } => self.failed += 1,
            _ => self.succeeded += 1,
        }
        self.current = Some(destination);
    }

    /// Check if every entry has finished.
    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedlink_core::FailureReason;

    #[test]
    fn test_record_and_percentage() {
        let mut progress = LinkProgress::new(4);
        assert_eq!(progress.percentage(), 0.0);

        progress.record("/d/a".into(), &Disposition::Linked { source: "/s/a".into() });
        progress.record(
            "/d/b".into(),
            &Disposition::Failed {
                reason: FailureReason::CreateLink {
                    message: "denied".to_string(),
                },
            },
        );

        assert_eq!(progress.percentage(), 50.0);
        assert_eq!(progress.succeeded, 1);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.current, Some(PathBuf::from("/d/b")));
        assert!(!progress.is_done());
    }
}
