use crate::backup::backup_config::BackupConfig;
use crate::backup::copy::FileCopier;
use crate::backup::exclude::ExclusionMatcher;
use crate::backup::function_path;
use crate::backup::record::BackupRecord;
use crate::backup::report::ProgressReporter;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use crate::backup::stats::CopyStats;
use crate::backup::walker::{create_new_directory, ensure_directory, TreeWalker};

use chrono::{DateTime, Local, TimeZone};
use function_name::named;
use std::fmt::Display;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static TIME_FORMAT: &str = "%Y%m%d_%H%M%S";
static RUN_DIR_PREFIX: &str = "backup_";

/// `YYYYMMDD_HHMMSS` identifier of a run started at `dt`.
pub fn timestamp_id<O: Display, T: TimeZone<Offset = O>>(dt: &DateTime<T>) -> String {
    dt.format(TIME_FORMAT).to_string()
}

#[derive(Debug)]
pub struct RunOutcome {
    pub destination: PathBuf,
    pub metadata_path: PathBuf,
    pub record: BackupRecord,
}

/// Drives a single backup run from directory setup to metadata.
///
/// Only setup failures abort a run: the base or run directory cannot be
/// created, the source cannot be resolved, or the metadata file cannot be
/// written. Anything going wrong for individual entries is counted in the
/// run's statistics and the run still succeeds.
pub struct RunCoordinator<'a> {
    config: &'a BackupConfig,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(config: &'a BackupConfig, reporter: &'a dyn ProgressReporter) -> Self {
        Self { config, reporter }
    }

    pub fn run<P: AsRef<Path>>(&self, source: P, message: Option<&str>) -> Result<RunOutcome> {
        self.run_at(source, message, Local::now())
    }

    #[named]
    pub fn run_at<P: AsRef<Path>, O: Display, T: TimeZone<Offset = O>>(
        &self,
        source: P,
        message: Option<&str>,
        started_at: DateTime<T>,
    ) -> Result<RunOutcome> {
        let timestamp = timestamp_id(&started_at);
        let message = message.filter(|m| !m.is_empty());
        let source = source
            .as_ref()
            .canonicalize()
            .map_err(Error::from)
            .with_msg(format!("Resolve source directory failed: {:?}", source.as_ref()))?;

        let base = self.config.backup_base_dir();
        ensure_directory(base)
            .with_debug_object_and_fn_name(base.clone(), function_path!())
            .with_msg("Create backup base directory failed")?;

        let destination = base.join(format!("{RUN_DIR_PREFIX}{timestamp}"));
        create_new_directory(&destination)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::RunDirectoryExists(destination.clone()),
                _ => Error::from(e),
            })
            .with_debug_object_and_fn_name(destination.clone(), function_path!())
            .with_msg("Create run directory failed")?;

        debug!("Backing up {:?} to {:?}", source, destination);
        self.reporter
            .started(&source, &destination, &timestamp, message);

        let stats = self.copy_tree(&source, &destination);

        let record = BackupRecord::builder()
            .timestamp(timestamp)
            .source(source)
            .destination(destination.clone())
            .maybe_message(message)
            .rules(self.config.exclude().clone())
            .stats(stats)
            .build();
        let metadata_path = record
            .write_to(&destination)
            .with_debug_object_and_fn_name(destination.clone(), function_path!())
            .with_msg("Write backup metadata failed")?;

        if stats.failed > 0 {
            warn!(
                "Backup {:?} finished, {} entries could not be copied",
                destination, stats.failed
            );
        } else {
            debug!("Backup {:?} finished", destination);
        }
        self.reporter.finished(&record);

        Ok(RunOutcome {
            destination,
            metadata_path,
            record,
        })
    }

    fn copy_tree(&self, source: &Path, destination: &Path) -> CopyStats {
        let matcher = ExclusionMatcher::new(self.config.exclude().clone());
        let mut copier = FileCopier::from_config(self.config);
        let mut walker = TreeWalker::new(&matcher, &mut copier, self.reporter);

        // The run directory may sit inside the source tree under a name no
        // rule excludes; never copy it into itself.
        for guard in [self.config.backup_base_dir().as_path(), destination] {
            match guard.canonicalize() {
                Ok(guard) if guard != source && guard.starts_with(source) => {
                    walker = walker.with_guard(guard);
                }
                Ok(_) => {}
                Err(e) => warn!("Cannot resolve {:?}: {}", guard, e),
            }
        }

        let mut stats = CopyStats::default();
        stats.merge(&walker.walk(source, destination, ""));
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::record::METADATA_FILE_NAME;
    use crate::backup::report::{ConsoleReporter, Verbosity};
    use chrono::Utc;
    use std::io::Write;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 7, h, m, s).unwrap()
    }

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn config(base: &Path) -> BackupConfig {
        BackupConfig::builder().backup_base_dir(base).build()
    }

    fn silent() -> ConsoleReporter<Vec<u8>> {
        ConsoleReporter::new(Verbosity::Silent, Vec::new())
    }

    #[test]
    fn test_timestamp_id() {
        assert_eq!(timestamp_id(&at(3, 59, 56)), "20251007_035956");
    }

    #[test]
    fn test_run_scenario() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.txt", b"hi");
        write(src.path(), "node_modules/x.txt", b"ignored");
        write(src.path(), "sub/b.log", b"ignored");
        write(src.path(), "sub/c.txt", b"ok");

        let config = config(&out.path().join("backups"));
        let reporter = silent();
        let outcome = RunCoordinator::new(&config, &reporter)
            .run_at(src.path(), Some("first"), at(12, 0, 0))
            .unwrap();

        let dst = &outcome.destination;
        assert_eq!(dst, &out.path().join("backups/backup_20251007_120000"));
        assert_eq!(std::fs::read(dst.join("a.txt")).unwrap(), b"hi");
        assert_eq!(std::fs::read(dst.join("sub/c.txt")).unwrap(), b"ok");
        assert!(!dst.join("node_modules").exists());
        assert!(!dst.join("sub/b.log").exists());

        let stats = outcome.record.stats();
        assert_eq!(stats.files_copied, 2);
        assert!(stats.dirs_created >= 1);
        assert_eq!(stats.skipped, 2);

        assert_eq!(outcome.metadata_path, dst.join(METADATA_FILE_NAME));
        let info = std::fs::read_to_string(&outcome.metadata_path).unwrap();
        assert!(info.contains("Timestamp: 20251007_120000\n"));
        assert!(info.contains("Message: first\n"));
        assert!(info.contains("  - node_modules\n"));
        assert!(info.contains("  Files copied: 2\n"));
        assert!(info.contains("  Items skipped: 2\n"));
    }

    #[test]
    fn test_two_runs_are_distinct_and_complete() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.txt", b"one");
        write(src.path(), "d/b.txt", b"two");

        let config = config(out.path());
        let reporter = silent();
        let coordinator = RunCoordinator::new(&config, &reporter);
        let first = coordinator.run_at(src.path(), None, at(1, 0, 0)).unwrap();
        let second = coordinator.run_at(src.path(), None, at(1, 0, 1)).unwrap();

        assert_ne!(first.destination, second.destination);
        for outcome in [&first, &second] {
            assert_eq!(std::fs::read(outcome.destination.join("a.txt")).unwrap(), b"one");
            assert_eq!(std::fs::read(outcome.destination.join("d/b.txt")).unwrap(), b"two");
            assert!(outcome.metadata_path.is_file());
        }
        assert_eq!(first.record.stats(), second.record.stats());
    }

    #[test]
    fn test_same_timestamp_is_fatal() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.txt", b"x");

        let config = config(out.path());
        let reporter = silent();
        let coordinator = RunCoordinator::new(&config, &reporter);
        coordinator.run_at(src.path(), None, at(2, 0, 0)).unwrap();
        let err = coordinator.run_at(src.path(), None, at(2, 0, 0)).unwrap_err();

        assert!(err.to_string().starts_with("Create run directory failed"));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_base_dir_is_file_is_fatal() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let base = out.path().join("not_a_dir");
        std::fs::write(&base, "x").unwrap();

        let config = config(&base);
        let reporter = silent();
        let err = RunCoordinator::new(&config, &reporter)
            .run_at(src.path(), None, at(3, 0, 0))
            .unwrap_err();

        assert!(err
            .to_string()
            .starts_with("Create backup base directory failed"));
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let out = TempDir::new().unwrap();
        let config = config(out.path());
        let reporter = silent();
        let res = RunCoordinator::new(&config, &reporter).run_at(
            out.path().join("missing"),
            None,
            at(4, 0, 0),
        );
        assert!(res.is_err());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_backup_dir_inside_source_not_copied() {
        let src = TempDir::new().unwrap();
        write(src.path(), "a.txt", b"x");

        let config = config(&src.path().join("snapshots"));
        let reporter = silent();
        let coordinator = RunCoordinator::new(&config, &reporter);
        coordinator.run_at(src.path(), None, at(5, 0, 0)).unwrap();
        let second = coordinator.run_at(src.path(), None, at(5, 0, 1)).unwrap();

        assert!(second.destination.join("a.txt").is_file());
        assert!(!second.destination.join("snapshots").exists());
        assert_eq!(second.record.stats().skipped, 1);
    }

    #[test]
    fn test_large_and_small_files() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let large: Vec<u8> = (0..50 * 1024 * 1024usize).map(|i| (i % 241) as u8).collect();
        let small: Vec<u8> = (0..10 * 1024usize).map(|i| (i % 7) as u8).collect();
        let mut f = std::fs::File::create(src.path().join("large.bin")).unwrap();
        f.write_all(&large).unwrap();
        drop(f);
        write(src.path(), "small.bin", &small);

        let config = config(out.path());
        let reporter = silent();
        let outcome = RunCoordinator::new(&config, &reporter)
            .run_at(src.path(), None, at(6, 0, 0))
            .unwrap();

        assert_eq!(std::fs::read(outcome.destination.join("large.bin")).unwrap(), large);
        assert_eq!(std::fs::read(outcome.destination.join("small.bin")).unwrap(), small);
        assert_eq!(
            outcome.record.stats().bytes_copied,
            (large.len() + small.len()) as u64
        );
        assert!(std::fs::read_to_string(&outcome.metadata_path)
            .unwrap()
            .contains("  Total size: 50.01 MB\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_partial_failure_still_succeeds() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "locked/secret.txt", b"s");
        write(src.path(), "open.txt", b"o");
        let locked = src.path().join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        let readable = std::fs::read_dir(&locked).is_ok();

        let config = config(out.path());
        let reporter = silent();
        let res = RunCoordinator::new(&config, &reporter).run_at(src.path(), None, at(7, 0, 0));
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let outcome = res.unwrap();
        assert!(outcome.destination.join("open.txt").is_file());
        assert!(outcome.destination.join("locked").is_dir());
        if !readable {
            assert_eq!(outcome.record.stats().failed, 1);
            assert!(std::fs::read_to_string(&outcome.metadata_path)
                .unwrap()
                .contains("  Errors: 1\n"));
        }
    }

    #[test]
    fn test_console_output_of_run() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "a.txt", b"hi");
        write(src.path(), ".git/HEAD", b"ref");

        let config = config(out.path());
        let reporter = ConsoleReporter::new(Verbosity::Normal, Vec::new());
        RunCoordinator::new(&config, &reporter)
            .run_at(src.path(), Some("msg"), at(8, 0, 0))
            .unwrap();

        let printed = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(printed.contains("Timestamp:   20251007_080000\n"));
        assert!(printed.contains("Message:     msg\n"));
        assert!(printed.contains("  File: a.txt\n"));
        assert!(printed.contains("  Skipping: .git\n"));
        assert!(printed.contains("Files: 1 | Dirs: 0 | Size: 0.00 MB | Skipped: 1\n"));
    }
}
