use crate::backup::copy::{CopyJob, CopyStrategy};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;

use memmap2::{Mmap, MmapMut};
use std::fs::File;

/// Default size from which files are copied through memory maps (10 MiB)
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Copies a whole file through two memory maps: the source read-only, the
/// destination writable after being sized to match.
#[derive(Debug, Default, Clone, Copy)]
pub struct MmapCopy;

impl CopyStrategy for MmapCopy {
    fn copy(&mut self, job: &CopyJob<'_>, src: &mut File, dst: &mut File) -> Result<u64> {
        dst.set_len(job.size)?;
        if job.size == 0 {
            return Ok(0);
        }

        // SAFETY: the map is only read while `src` is open, and a source
        // changing underneath a backup is caught by the length check below.
        let src_map = unsafe { Mmap::map(&*src) }?;
        if src_map.len() as u64 != job.size {
            return Err(Error::SizeChanged {
                path: job.src.to_path_buf(),
                expected: job.size,
                actual: src_map.len() as u64,
            });
        }

        // SAFETY: `dst` was just created and truncated by this process.
        let mut dst_map = unsafe { MmapMut::map_mut(&*dst) }?;
        if dst_map.len() != src_map.len() {
            return Err(Error::SizeChanged {
                path: job.dst.to_path_buf(),
                expected: job.size,
                actual: dst_map.len() as u64,
            });
        }

        dst_map.copy_from_slice(&src_map);
        dst_map.flush()?;

        tracing::trace!("Mapped {} bytes into {:?}", job.size, job.dst);
        Ok(job.size)
    }
}
