pub mod chunked;
pub mod mmap;

use crate::backup::backup_config::BackupConfig;
use crate::backup::copy::chunked::ChunkedCopy;
use crate::backup::copy::mmap::MmapCopy;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;

use derive_more::Display;
use std::fs::{File, OpenOptions, Permissions};
use std::path::Path;

/// The file a strategy is asked to copy.
#[derive(Debug, Clone, Copy)]
pub struct CopyJob<'a> {
    pub src: &'a Path,
    pub dst: &'a Path,
    /// Source size as reported by metadata before the copy started
    pub size: u64,
}

/// A way of moving the bytes of one open file into another.
///
/// `dst` is already created and truncated; implementations return the
/// number of bytes written. Both handles stay owned by the caller and are
/// closed on every path once the strategy returns.
pub trait CopyStrategy {
    fn copy(&mut self, job: &CopyJob<'_>, src: &mut File, dst: &mut File) -> Result<u64>;
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    #[display("mapped")]
    Mapped,
    #[display("chunked")]
    Chunked,
}

/// Copies single regular files, picking a strategy by size.
#[derive(Debug)]
pub struct FileCopier {
    large_file_threshold: u64,
    remove_partial_files: bool,
    mapped: MmapCopy,
    chunked: ChunkedCopy,
}

impl FileCopier {
    pub fn new(large_file_threshold: u64, chunk_size: usize, remove_partial_files: bool) -> Self {
        Self {
            large_file_threshold,
            remove_partial_files,
            mapped: MmapCopy,
            chunked: ChunkedCopy::new(chunk_size),
        }
    }

    pub fn from_config(config: &BackupConfig) -> Self {
        Self::new(
            *config.large_file_threshold(),
            *config.chunk_size(),
            *config.remove_partial_files(),
        )
    }

    pub fn method_for(&self, size: u64) -> CopyMethod {
        if size >= self.large_file_threshold {
            CopyMethod::Mapped
        } else {
            CopyMethod::Chunked
        }
    }

    fn strategy(&mut self, method: CopyMethod) -> &mut dyn CopyStrategy {
        match method {
            CopyMethod::Mapped => &mut self.mapped,
            CopyMethod::Chunked => &mut self.chunked,
        }
    }

    /// Copies `src` to `dst` and carries the permission bits over.
    ///
    /// Returns the number of bytes copied. Failing to open or stat the
    /// source yields [`Error::SourceUnreadable`]; anything failing after
    /// that is reported as [`Error::CopyFailed`]. A partially written
    /// destination is left behind unless `remove_partial_files` is set.
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(&mut self, src: P1, dst: P2) -> Result<u64> {
        let src = src.as_ref();
        let dst = dst.as_ref();

        let source_unreadable = |e| Error::SourceUnreadable {
            path: src.to_path_buf(),
            source: e,
        };
        let mut src_file = File::open(src).map_err(source_unreadable)?;
        let metadata = src_file.metadata().map_err(source_unreadable)?;

        let job = CopyJob {
            src,
            dst,
            size: metadata.len(),
        };
        let method = self.method_for(job.size);
        tracing::debug!("Copying {:?} ({} bytes, {})", src, job.size, method);

        let mut dst_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(dst)
            .map_err(|e| Error::from(e).copy_failed(src, dst))?;

        match self.strategy(method).copy(&job, &mut src_file, &mut dst_file) {
            Ok(bytes) => {
                preserve_permissions(&dst_file, dst, metadata.permissions());
                Ok(bytes)
            }
            Err(e) => {
                drop(dst_file);
                if self.remove_partial_files {
                    if let Err(rm) = std::fs::remove_file(dst) {
                        return Err(e.chain(rm.into()).copy_failed(src, dst));
                    }
                    tracing::debug!("Removed partial file {:?}", dst);
                }
                Err(e.copy_failed(src, dst))
            }
        }
    }
}

impl Default for FileCopier {
    fn default() -> Self {
        Self::new(
            mmap::DEFAULT_LARGE_FILE_THRESHOLD,
            chunked::DEFAULT_CHUNK_SIZE,
            false,
        )
    }
}

/// Best effort: a copy with default permissions is still a good copy.
fn preserve_permissions(dst_file: &File, dst: &Path, permissions: Permissions) {
    if let Err(e) = dst_file.set_permissions(permissions) {
        tracing::trace!("Keeping default permissions on {:?}: {}", dst, e);
    }
}
