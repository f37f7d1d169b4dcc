//! Mirrors a source tree into a destination tree.
//!
//! Traversal is depth first in directory listing order. Excluded entries are
//! pruned before their type is even looked at, so an excluded directory is
//! never descended into. Every failure below the starting directory is a
//! per-entry warning: it is logged, counted, and the walk moves on to the
//! next sibling.

use crate::backup::copy::FileCopier;
use crate::backup::exclude::ExclusionMatcher;
use crate::backup::report::ProgressReporter;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::stats::CopyStats;

use walkdir::{DirEntry, WalkDir};

use std::cell::Cell;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct TreeWalker<'a> {
    matcher: &'a ExclusionMatcher,
    copier: &'a mut FileCopier,
    reporter: &'a dyn ProgressReporter,
    guards: Vec<PathBuf>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        matcher: &'a ExclusionMatcher,
        copier: &'a mut FileCopier,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            matcher,
            copier,
            reporter,
            guards: Vec::new(),
        }
    }

    /// Never descend into `path`, whatever its name. Used to keep a run
    /// from copying its own backup directory when it lives in the source.
    pub fn with_guard<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.guards.push(path.into());
        self
    }

    /// Copies `src_root/rel_path` into `dst_root/rel_path`.
    ///
    /// An empty `rel_path` walks from the roots themselves; the destination
    /// root is expected to exist already. For a non-empty `rel_path` every
    /// missing directory between `dst_root` and `dst_root/rel_path` is
    /// created first. Returns the counters
    /// for this subtree only.
    pub fn walk<P1: AsRef<Path>, P2: AsRef<Path>, P3: AsRef<Path>>(
        &mut self,
        src_root: P1,
        dst_root: P2,
        rel_path: P3,
    ) -> CopyStats {
        let (src_root, dst_root, rel_path) =
            (src_root.as_ref(), dst_root.as_ref(), rel_path.as_ref());
        let mut stats = CopyStats::default();

        let src_dir = join_relative(src_root, rel_path);
        if let Err(e) = ensure_directory_chain(dst_root, rel_path) {
            tracing::warn!("Cannot create directory for {:?}: {}", rel_path, e);
            stats.failed += 1;
            return stats;
        }

        tracing::debug!("Walking {:?}", src_dir);
        let matcher = self.matcher;
        let reporter = self.reporter;
        let guards = self.guards.clone();
        let skipped = Cell::new(0u64);

        let mut entries = WalkDir::new(&src_dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|de| {
                if de.depth() == 0 {
                    return true;
                }
                let excluded = match matcher.first_match(de.file_name()) {
                    Some(rule) => {
                        tracing::trace!("{:?} excluded by {}", de.path(), rule);
                        true
                    }
                    None => guards.iter().any(|g| de.path() == g),
                };
                if excluded {
                    reporter.skipping(relative_to(de.path(), src_root));
                    skipped.set(skipped.get() + 1);
                }
                !excluded
            });

        while let Some(res) = entries.next() {
            let de = match res {
                Ok(de) => de,
                Err(e) => {
                    let e = Error::from(e).with_msg("Cannot read entry");
                    tracing::warn!("{e}");
                    stats.failed += 1;
                    continue;
                }
            };
            if de.depth() == 0 {
                continue;
            }

            let rel = relative_to(de.path(), src_root);
            let dst = dst_root.join(rel);
            if let Err(e) = self.visit(&de, rel, &dst, &mut stats) {
                tracing::warn!("Skipping {:?}: {}", rel, e);
                stats.failed += 1;
                if de.file_type().is_dir() {
                    entries.skip_current_dir();
                }
            }
        }

        stats.skipped += skipped.get();
        stats
    }

    /// Handles one entry that survived exclusion.
    fn visit(
        &mut self,
        de: &DirEntry,
        rel: &Path,
        dst: &Path,
        stats: &mut CopyStats,
    ) -> Result<()> {
        let file_type = de.file_type();
        if file_type.is_dir() {
            ensure_directory(dst)?;
            stats.dirs_created += 1;
            self.reporter.dir(rel);
        } else if file_type.is_file() {
            let bytes = self.copier.copy_file(de.path(), dst)?;
            stats.record_file(bytes);
            self.reporter.file(rel);
        } else if file_type.is_symlink() {
            let target = copy_symlink(de.path(), dst)?;
            stats.links_created += 1;
            self.reporter.link(rel, &target);
        } else {
            tracing::trace!("Ignoring special file {:?}", de.path());
        }
        Ok(())
    }
}

fn join_relative(root: &Path, rel_path: &Path) -> PathBuf {
    if rel_path.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel_path)
    }
}

/// Every walked path starts with `root`; fall back to the full path rather
/// than failing the entry if it somehow does not.
fn relative_to<'p>(path: &'p Path, root: &Path) -> &'p Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Creates `path` as a directory unless one is already there.
///
/// An existing non-directory at `path` is an error.
pub fn ensure_directory<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    match std::fs::metadata(path) {
        Ok(md) if md.is_dir() => return Ok(()),
        Ok(_) => return Err(Error::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    match dir_builder().create(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Creates each directory of `rel_path` below `root`, outermost first.
fn ensure_directory_chain(root: &Path, rel_path: &Path) -> Result<()> {
    let mut dir = root.to_path_buf();
    for component in rel_path.components() {
        dir.push(component);
        ensure_directory(&dir)?;
    }
    Ok(())
}

/// Creates `path` as a directory, failing if anything already exists there.
pub fn create_new_directory<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    dir_builder().create(path)
}

fn dir_builder() -> std::fs::DirBuilder {
    #[allow(unused_mut)]
    let mut builder = std::fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
}

/// Recreates the link at `dst` with the same, unresolved, target string.
fn copy_symlink(src: &Path, dst: &Path) -> Result<PathBuf> {
    let target = std::fs::read_link(src)?;
    make_symlink(src, &target, dst)?;
    Ok(target)
}

#[cfg(unix)]
fn make_symlink(_src: &Path, target: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(windows)]
fn make_symlink(src: &Path, target: &Path, dst: &Path) -> std::io::Result<()> {
    if std::fs::metadata(src).map(|md| md.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(target, dst)
    } else {
        std::os::windows::fs::symlink_file(target, dst)
    }
}

#[cfg(not(any(unix, windows)))]
fn make_symlink(_src: &Path, _target: &Path, dst: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        ErrorKind::Unsupported,
        format!("cannot recreate symlink {:?} on this platform", dst),
    ))
}
