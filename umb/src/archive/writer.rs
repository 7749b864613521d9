//! Writing tar archives of named, size-declared entries

use super::compression::CompressedWriter;
use crate::config::ExportConfig;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use umb_core::{Result, UmbError};

/// Sequential writer of archive entries
///
/// Layers are closed innermost-last by [`ArchiveWriter::finish`]: tar
/// trailer, then compression trailer, then the raw sink is flushed.
pub struct ArchiveWriter<W: Write> {
    builder: tar::Builder<CompressedWriter<W>>,
    entries: usize,
}

impl ArchiveWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path`
    pub fn create<P: AsRef<Path>>(path: P, config: &ExportConfig) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file), config)
    }
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(inner: W, config: &ExportConfig) -> Result<Self> {
        if let Some(format) = config.compression {
            if !format.is_allowed() {
                tracing::warn!(%format, "writing with a compression format conformant readers may reject");
            }
        }
        Ok(Self {
            builder: tar::Builder::new(CompressedWriter::new(inner, config)?),
            entries: 0,
        })
    }

    /// Add an entry of exactly `size` bytes read from `data`
    ///
    /// `data` yielding fewer or more bytes than declared is a size mismatch.
    pub fn write_entry<R: Read>(&mut self, name: &str, size: u64, data: R) -> Result<()> {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(size);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        self.builder
            .append_data(&mut header, name, ExactSize::new(name, size, data))?;
        self.entries += 1;
        tracing::debug!(entry = name, size, "wrote archive entry");
        Ok(())
    }

    /// Add a UTF-8 text entry
    pub fn write_text(&mut self, name: &str, text: &str) -> Result<()> {
        self.write_entry(name, text.len() as u64, text.as_bytes())
    }

    /// Number of entries written so far
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Finish every layer and return the flushed raw sink
    pub fn finish(self) -> Result<W> {
        let compressed = self.builder.into_inner()?;
        let mut inner = compressed.finish()?;
        inner.flush()?;
        Ok(inner)
    }
}

/// Reader adapter that insists on exactly `declared` bytes
struct ExactSize<R> {
    entry: String,
    declared: u64,
    produced: u64,
    inner: R,
}

impl<R: Read> ExactSize<R> {
    fn new(entry: &str, declared: u64, inner: R) -> Self {
        Self {
            entry: entry.to_string(),
            declared,
            produced: 0,
            inner,
        }
    }

    fn mismatch(&self, actual: u64) -> io::Error {
        UmbError::SizeMismatch {
            entry: self.entry.clone(),
            expected: self.declared,
            actual,
        }
        .into_io()
    }
}

impl<R: Read> Read for ExactSize<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.declared - self.produced;
        if remaining == 0 {
            let mut probe = [0u8; 1];
            return match self.inner.read(&mut probe)? {
                0 => Ok(0),
                _ => Err(self.mismatch(self.declared + 1)),
            };
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let limit = remaining.min(buf.len() as u64) as usize;
        let read = self.inner.read(&mut buf[..limit])?;
        if read == 0 {
            return Err(self.mismatch(self.produced));
        }
        self.produced += read as u64;
        Ok(read)
    }
}
