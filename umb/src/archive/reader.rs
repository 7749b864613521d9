//! Forward-scanning access to archive entries

use super::compression::open_decoder;
use crate::config::READ_BUFFER_SIZE;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use umb_core::{CompressionFormat, Result, UmbError};

/// One pass over an archive
///
/// Entries can only be visited in stored order, so a reader is consumed by
/// a single lookup; open a new one to look for another entry.
pub struct ArchiveReader {
    archive: tar::Archive<Box<dyn Read>>,
    compression: Option<CompressionFormat>,
}

impl ArchiveReader {
    /// Open the file at `path`, detecting its compression
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::with_capacity(READ_BUFFER_SIZE, file))
    }

    /// Read an archive from any buffered source
    pub fn from_reader<R: BufRead + 'static>(reader: R) -> Result<Self> {
        let (stream, compression) = open_decoder(reader)?;
        Ok(Self {
            archive: tar::Archive::new(stream),
            compression,
        })
    }

    /// Compression detected on open
    pub fn compression(&self) -> Option<CompressionFormat> {
        self.compression
    }

    /// Scan forward to the regular entry called `name` and hand it to `read`
    pub fn find_entry<T>(
        mut self,
        name: &str,
        read: impl FnOnce(EntryReader<'_>) -> Result<T>,
    ) -> Result<T> {
        for entry in self.archive.entries()? {
            let entry = entry?;
            if !entry.header().entry_type().is_file() {
                tracing::trace!(
                    entry = %String::from_utf8_lossy(&entry.path_bytes()),
                    "skipping non-file entry"
                );
                continue;
            }
            if entry.path_bytes().as_ref() != name.as_bytes() {
                continue;
            }
            let size = entry.header().size()?;
            tracing::debug!(entry = name, size, "found archive entry");
            return read(EntryReader::new(name, size, entry));
        }
        Err(UmbError::not_found(format!("archive entry \"{name}\"")))
    }

    /// Whether a regular entry called `name` exists
    pub fn contains_entry(self, name: &str) -> Result<bool> {
        match self.find_entry(name, |_| Ok(())) {
            Ok(()) => Ok(true),
            Err(UmbError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Names of all regular entries in stored order
    pub fn entry_names(mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.archive.entries()? {
            let entry = entry?;
            if entry.header().entry_type().is_file() {
                names.push(String::from_utf8_lossy(&entry.path_bytes()).into_owned());
            }
        }
        Ok(names)
    }
}

/// A located entry, read in fixed-size chunks
pub struct EntryReader<'a> {
    name: String,
    size: u64,
    inner: BufReader<tar::Entry<'a, Box<dyn Read>>>,
}

impl<'a> EntryReader<'a> {
    fn new(name: &str, size: u64, entry: tar::Entry<'a, Box<dyn Read>>) -> Self {
        Self {
            name: name.to_string(),
            size,
            inner: BufReader::with_capacity(READ_BUFFER_SIZE, entry),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Fill `buf` completely; `false` means the entry ended first
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(filled == buf.len())
    }

    /// Like [`EntryReader::read_chunk`], but a short read is an error
    pub fn read_exact_chunk(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.read_chunk(buf)? {
            return Ok(());
        }
        Err(UmbError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("archive entry \"{}\" ended early", self.name),
        )))
    }

    /// The whole entry as UTF-8 text
    pub fn read_to_string(mut self) -> Result<String> {
        let mut bytes = Vec::with_capacity(self.size.min(1 << 20) as usize);
        self.inner.read_to_end(&mut bytes)?;
        if bytes.len() as u64 != self.size {
            return Err(UmbError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "archive entry \"{}\" holds {} of {} bytes",
                    self.name,
                    bytes.len(),
                    self.size
                ),
            )));
        }
        String::from_utf8(bytes).map_err(|err| {
            UmbError::schema(format!("archive entry \"{}\" is not UTF-8: {err}", self.name))
        })
    }
}
