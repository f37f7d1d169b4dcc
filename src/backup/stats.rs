const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Counters for one backup run, or for one walked subtree of it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files_copied: u64,
    pub dirs_created: u64,
    pub links_created: u64,
    pub bytes_copied: u64,
    /// Entries dropped by an exclusion rule.
    pub skipped: u64,
    /// Entries that could not be read, copied or recreated.
    pub failed: u64,
}

impl CopyStats {
    pub fn size_mib(&self) -> f64 {
        self.bytes_copied as f64 / BYTES_PER_MIB
    }

    pub fn record_file(&mut self, bytes: u64) {
        self.files_copied += 1;
        self.bytes_copied += bytes;
    }

    pub fn merge(&mut self, other: &CopyStats) {
        self.files_copied += other.files_copied;
        self.dirs_created += other.dirs_created;
        self.links_created += other.links_created;
        self.bytes_copied += other.bytes_copied;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}
