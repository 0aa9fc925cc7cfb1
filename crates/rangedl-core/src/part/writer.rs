//! Buffered writer for a part's private temp file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Appends body chunks to a temp file, flushing once the in-memory buffer
/// grows past `threshold` bytes.
pub(crate) struct PartWriter {
    file: File,
    buf: Vec<u8>,
    threshold: usize,
    written: u64,
}

impl PartWriter {
    /// Create (or truncate) the file at `path`.
    pub(crate) fn create(path: &Path, threshold: usize) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file,
            buf: Vec::with_capacity(threshold.saturating_add(1)),
            threshold,
            written: 0,
        })
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(chunk);
        if self.buf.len() > self.threshold {
            self.flush_buf()?;
        }
        Ok(())
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.file.write_all(&self.buf)?;
            self.written += self.buf.len() as u64;
            self.buf.clear();
        }
        Ok(())
    }

    /// Write what is left in the buffer and close the file. Returns total bytes on disk.
    pub(crate) fn finish(mut self) -> io::Result<u64> {
        self.flush_buf()?;
        self.file.flush()?;
        Ok(self.written)
    }

    /// Bytes already written to disk (excludes the buffer).
    #[cfg(test)]
    pub(crate) fn written(&self) -> u64 {
        self.written
    }
}
