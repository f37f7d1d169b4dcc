//! The `backup_info.txt` metadata written at the top of every run directory.

use crate::backup::exclude::ExclusionRule;
use crate::backup::result_error::result::Result;
use crate::backup::stats::CopyStats;

use bon::Builder;
use getset::Getters;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub static METADATA_FILE_NAME: &str = "backup_info.txt";

/// Summary of one finished run. Built once, written once.
#[derive(Clone, Debug, PartialEq, Builder, Getters)]
#[getset(get = "pub")]
pub struct BackupRecord {
    #[builder(into)]
    timestamp: String,
    #[builder(into)]
    source: PathBuf,
    #[builder(into)]
    destination: PathBuf,
    #[builder(into)]
    message: Option<String>,
    #[builder(into)]
    rules: Arc<[ExclusionRule]>,
    stats: CopyStats,
}

impl BackupRecord {
    /// Writes the record as `backup_info.txt` inside `dir`.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(METADATA_FILE_NAME);
        let mut writer = BufWriter::new(File::create(&path)?);
        write!(writer, "{self}")?;
        writer.flush()?;
        tracing::debug!("Wrote metadata {:?}", path);
        Ok(path)
    }
}

impl Display for BackupRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Backup Information")?;
        writeln!(f, "==================")?;
        writeln!(f)?;
        writeln!(f, "Timestamp: {}", self.timestamp)?;
        writeln!(f, "Source Directory: {}", self.source.display())?;
        writeln!(f, "Backup Directory: {}", self.destination.display())?;
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            writeln!(f, "Message: {message}")?;
        }

        writeln!(f)?;
        writeln!(f, "Excluded Patterns:")?;
        for rule in self.rules.iter() {
            writeln!(f, "  - {rule}")?;
        }

        let stats = &self.stats;
        writeln!(f)?;
        writeln!(f, "Statistics:")?;
        writeln!(f, "  Files copied: {}", stats.files_copied)?;
        writeln!(f, "  Directories: {}", stats.dirs_created)?;
        writeln!(f, "  Symlinks: {}", stats.links_created)?;
        writeln!(f, "  Total size: {:.2} MB", stats.size_mib())?;
        writeln!(f, "  Items skipped: {}", stats.skipped)?;
        writeln!(f, "  Errors: {}", stats.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(message: Option<&str>) -> BackupRecord {
        BackupRecord::builder()
            .timestamp("20251007_035956")
            .source("/home/me/project")
            .destination("project_backups/backup_20251007_035956")
            .maybe_message(message)
            .rules(vec![ExclusionRule::exact(".git"), ExclusionRule::suffix("log")])
            .stats(CopyStats {
                files_copied: 12,
                dirs_created: 3,
                links_created: 1,
                bytes_copied: 5 * 1024 * 1024 + 512 * 1024,
                skipped: 2,
                failed: 0,
            })
            .build()
    }

    #[test]
    fn test_format() {
        let expected = "\
Backup Information
==================

Timestamp: 20251007_035956
Source Directory: /home/me/project
Backup Directory: project_backups/backup_20251007_035956
Message: nightly

Excluded Patterns:
  - .git
  - *.log

Statistics:
  Files copied: 12
  Directories: 3
  Symlinks: 1
  Total size: 5.50 MB
  Items skipped: 2
  Errors: 0
";
        assert_eq!(record(Some("nightly")).to_string(), expected);
    }

    #[test]
    fn test_message_omitted_when_absent_or_empty() {
        assert!(!record(None).to_string().contains("Message:"));
        assert!(!record(Some("")).to_string().contains("Message:"));
    }

    #[test]
    fn test_write_to() {
        let temp_dir = TempDir::new().unwrap();
        let record = record(None);

        let path = record.write_to(temp_dir.path()).unwrap();

        assert_eq!(path, temp_dir.path().join(METADATA_FILE_NAME));
        assert_eq!(std::fs::read_to_string(path).unwrap(), record.to_string());
    }
}
