//! User-facing console output of a run.
//!
//! Diagnostics go through `tracing`; this is only the progress listing and
//! the banners, which the user can turn down with `--quiet` or off with
//! `--silent`.

use crate::backup::record::BackupRecord;

use std::cell::RefCell;
use std::io::{Stdout, Write};
use std::path::Path;
use tracing::level_filters::LevelFilter;

/// Receives progress events from a run. All methods default to doing
/// nothing.
pub trait ProgressReporter {
    fn dir(&self, _rel: &Path) {}
    fn file(&self, _rel: &Path) {}
    fn link(&self, _rel: &Path, _target: &Path) {}
    fn skipping(&self, _rel: &Path) {}
    fn started(&self, _source: &Path, _destination: &Path, _timestamp: &str, _message: Option<&str>) {}
    fn finished(&self, _record: &BackupRecord) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Normal,
    Quiet,
    Silent,
}

impl Verbosity {
    /// `silent` wins over `quiet`.
    pub fn from_flags(quiet: bool, silent: bool) -> Self {
        match (quiet, silent) {
            (_, true) => Verbosity::Silent,
            (true, false) => Verbosity::Quiet,
            (false, false) => Verbosity::Normal,
        }
    }

    /// Max level for the log subscriber matching this verbosity.
    pub fn log_level(&self) -> LevelFilter {
        match self {
            Verbosity::Normal => LevelFilter::INFO,
            Verbosity::Quiet => LevelFilter::WARN,
            Verbosity::Silent => LevelFilter::OFF,
        }
    }
}

pub struct ConsoleReporter<W: Write = Stdout> {
    verbosity: Verbosity,
    out: RefCell<W>,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self::new(verbosity, std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(verbosity: Verbosity, out: W) -> Self {
        Self {
            verbosity,
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    // Console output is best effort; a closed stdout must not fail a backup.
    fn line(&self, at: Verbosity, text: std::fmt::Arguments<'_>) {
        if self.verbosity == at {
            let _ = writeln!(self.out.borrow_mut(), "{text}");
        }
    }
}

impl<W: Write> ProgressReporter for ConsoleReporter<W> {
    fn dir(&self, rel: &Path) {
        self.line(Verbosity::Normal, format_args!("  Dir:  {}/", rel.display()));
    }

    fn file(&self, rel: &Path) {
        self.line(Verbosity::Normal, format_args!("  File: {}", rel.display()));
    }

    fn link(&self, rel: &Path, target: &Path) {
        self.line(
            Verbosity::Normal,
            format_args!("  Link: {} -> {}", rel.display(), target.display()),
        );
    }

    fn skipping(&self, rel: &Path) {
        self.line(Verbosity::Normal, format_args!("  Skipping: {}", rel.display()));
    }

    fn started(&self, source: &Path, destination: &Path, timestamp: &str, message: Option<&str>) {
        match self.verbosity {
            Verbosity::Normal => {
                let mut banner = format!(
                    "\n=== PROJECT AUTO-BACKUP ===\nSource:      {}\nDestination: {}\nTimestamp:   {}",
                    source.display(),
                    destination.display(),
                    timestamp
                );
                if let Some(message) = message {
                    banner.push_str(&format!("\nMessage:     {message}"));
                }
                self.line(Verbosity::Normal, format_args!("{banner}\n"));
            }
            Verbosity::Quiet => self.line(
                Verbosity::Quiet,
                format_args!("Backing up to {}...", destination.display()),
            ),
            Verbosity::Silent => {}
        }
    }

    fn finished(&self, record: &BackupRecord) {
        let stats = record.stats();
        match self.verbosity {
            Verbosity::Normal => {
                self.line(
                    Verbosity::Normal,
                    format_args!(
                        "\n=== BACKUP COMPLETE ===\nFiles: {} | Dirs: {} | Size: {:.2} MB | Skipped: {}",
                        stats.files_copied,
                        stats.dirs_created,
                        stats.size_mib(),
                        stats.skipped
                    ),
                );
                if stats.failed > 0 {
                    self.line(
                        Verbosity::Normal,
                        format_args!("Completed with {} warning(s)", stats.failed),
                    );
                }
                self.line(
                    Verbosity::Normal,
                    format_args!("Backup location: {}\n", record.destination().display()),
                );
            }
            Verbosity::Quiet => self.line(
                Verbosity::Quiet,
                format_args!(
                    "✓ Complete: {} files, {:.2} MB",
                    stats.files_copied,
                    stats.size_mib()
                ),
            ),
            Verbosity::Silent => {}
        }
    }
}
