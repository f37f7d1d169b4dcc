//! # auto-backup
//!
//! Takes timestamped snapshots of a project directory.
//!
//! ## Features
//!
//! - **Snapshots**: every run copies the tree into its own `backup_<YYYYMMDD_HHMMSS>` directory
//! - **Exclusions**: entry names such as `node_modules` or `*.log` are never copied
//! - **Large Files**: files of 10 MiB and more are copied through memory maps
//! - **Symlinks**: links are recreated, never followed
//! - **Metadata**: a `backup_info.txt` describing the run is left in every snapshot
//!
//! ## Quick Start
//!
//! ```no_run
//! use auto_backup::backup::backup_config::BackupConfig;
//! use auto_backup::backup::coordinator::RunCoordinator;
//! use auto_backup::backup::report::{ConsoleReporter, Verbosity};
//!
//! let config = BackupConfig::default();
//! let reporter = ConsoleReporter::stdout(Verbosity::Normal);
//! let outcome = RunCoordinator::new(&config, &reporter).run(".", Some("before refactor"))?;
//! println!("{}", outcome.destination.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
