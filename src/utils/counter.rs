//! Run-wide tallies printed when the binary exits.
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;

/// Outcomes of one run, split between whole archives and the resources
/// extracted from them.
#[derive(Debug, Default)]
pub struct Counter {
    archives: AtomicUsize,
    unrecognized: AtomicUsize,
    failed_archives: AtomicUsize,
    resources: AtomicUsize,
    failed_resources: AtomicUsize,
    warnings: AtomicUsize,
}

impl Counter {
    pub const fn new() -> Self {
        Self {
            archives: AtomicUsize::new(0),
            unrecognized: AtomicUsize::new(0),
            failed_archives: AtomicUsize::new(0),
            resources: AtomicUsize::new(0),
            failed_resources: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        }
    }

    pub fn archive_done(&self) {
        self.archives.fetch_add(1, Relaxed);
    }

    /// A file no descriptor claimed.
    pub fn archive_unrecognized(&self) {
        self.unrecognized.fetch_add(1, Relaxed);
    }

    pub fn archive_failed(&self) {
        self.failed_archives.fetch_add(1, Relaxed);
    }

    pub fn resource_done(&self) {
        self.resources.fetch_add(1, Relaxed);
    }

    pub fn resource_failed(&self) {
        self.failed_resources.fetch_add(1, Relaxed);
    }

    /// Lossy but non-fatal conversions, such as unmappable characters.
    pub fn warning(&self) {
        self.warnings.fetch_add(1, Relaxed);
    }

    /// Failed archives plus failed resources.
    pub fn failures(&self) -> usize {
        self.failed_archives.load(Relaxed) + self.failed_resources.load(Relaxed)
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Archives: {} ok, {} unrecognized, {} failed. Resources: {} extracted, {} failed. Warnings: {}",
            self.archives.load(Relaxed),
            self.unrecognized.load(Relaxed),
            self.failed_archives.load(Relaxed),
            self.resources.load(Relaxed),
            self.failed_resources.load(Relaxed),
            self.warnings.load(Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_cover_both_levels() {
        let counter = Counter::new();
        counter.archive_done();
        counter.archive_unrecognized();
        counter.resource_done();
        counter.resource_done();
        counter.warning();
        assert_eq!(counter.failures(), 0);
        counter.resource_failed();
        counter.archive_failed();
        assert_eq!(counter.failures(), 2);
        assert_eq!(
            counter.to_string(),
            "Archives: 1 ok, 1 unrecognized, 1 failed. Resources: 2 extracted, 1 failed. Warnings: 1"
        );
    }
}
