use crate::backup::copy::{CopyJob, CopyStrategy};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;

use std::fs::File;
use std::io::{ErrorKind, Read, Write};

/// Default size of the streaming buffer (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Streams a file through a fixed-size buffer.
///
/// The buffer is allocated once and reused for every file the copier
/// handles, so copying thousands of small files costs one allocation.
#[derive(Debug)]
pub struct ChunkedCopy {
    buffer: Box<[u8]>,
}

impl ChunkedCopy {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buffer: vec![0u8; chunk_size.max(1)].into_boxed_slice(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for ChunkedCopy {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl CopyStrategy for ChunkedCopy {
    fn copy(&mut self, job: &CopyJob<'_>, src: &mut File, dst: &mut File) -> Result<u64> {
        let mut total = 0u64;
        loop {
            let read = match src.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            let written = write_chunk(dst, &self.buffer[..read])?;
            if written != read {
                return Err(Error::ShortWrite {
                    path: job.dst.to_path_buf(),
                    written,
                    expected: read,
                });
            }
            total += read as u64;
        }

        tracing::trace!("Streamed {} bytes into {:?}", total, job.dst);
        Ok(total)
    }
}

/// One `write` call, retried only when interrupted. A short count is
/// returned as-is for the caller to reject.
fn write_chunk(dst: &mut File, chunk: &[u8]) -> std::io::Result<usize> {
    loop {
        match dst.write(chunk) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            res => return res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_size_floor() {
        assert_eq!(ChunkedCopy::new(0).chunk_size(), 1);
        assert_eq!(ChunkedCopy::default().chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_copy_spans_several_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let src_path = temp_dir.path().join("src.bin");
        let dst_path = temp_dir.path().join("dst.bin");
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src_path, &content).unwrap();

        let mut src = File::open(&src_path).unwrap();
        let mut dst = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&dst_path)
            .unwrap();
        let job = CopyJob {
            src: &src_path,
            dst: &dst_path,
            size: content.len() as u64,
        };

        let copied = ChunkedCopy::new(4096).copy(&job, &mut src, &mut dst).unwrap();
        drop(dst);

        assert_eq!(copied, content.len() as u64);
        assert_eq!(std::fs::read(&dst_path).unwrap(), content);
    }
}
