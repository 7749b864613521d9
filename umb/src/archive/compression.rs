//! Whole-stream compression around the tar container
//!
//! Writers pick a format explicitly; readers detect it from the first bytes
//! of the file and fall back to a plain tar.

use crate::config::ExportConfig;
use std::io::{self, BufRead, Read, Write};
use umb_core::{CompressionFormat, Result, UmbError};

#[cfg(any(not(feature = "xz"), not(feature = "zstd")))]
fn unsupported(format: CompressionFormat) -> UmbError {
    UmbError::Io(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{format} compression support is not compiled in"),
    ))
}

/// Compression encoder sitting between the tar builder and the raw sink
pub(crate) enum CompressedWriter<W: Write> {
    Plain(W),
    #[cfg(feature = "xz")]
    Xz(xz2::write::XzEncoder<W>),
    #[cfg(feature = "zstd")]
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> CompressedWriter<W> {
    pub(crate) fn new(inner: W, config: &ExportConfig) -> Result<Self> {
        match config.compression {
            None => Ok(CompressedWriter::Plain(inner)),
            Some(CompressionFormat::Xz) => xz_writer(inner, config.xz_preset),
            Some(CompressionFormat::Zstd) => zstd_writer(inner, config.zstd_level),
        }
    }

    /// Flush the compressed stream's trailer and hand back the raw sink
    pub(crate) fn finish(self) -> Result<W> {
        match self {
            CompressedWriter::Plain(inner) => Ok(inner),
            #[cfg(feature = "xz")]
            CompressedWriter::Xz(encoder) => Ok(encoder.finish()?),
            #[cfg(feature = "zstd")]
            CompressedWriter::Zstd(encoder) => Ok(encoder.finish()?),
        }
    }
}

#[cfg(feature = "xz")]
fn xz_writer<W: Write>(inner: W, preset: u32) -> Result<CompressedWriter<W>> {
    Ok(CompressedWriter::Xz(xz2::write::XzEncoder::new(inner, preset)))
}

#[cfg(not(feature = "xz"))]
fn xz_writer<W: Write>(_inner: W, _preset: u32) -> Result<CompressedWriter<W>> {
    Err(unsupported(CompressionFormat::Xz))
}

#[cfg(feature = "zstd")]
fn zstd_writer<W: Write>(inner: W, level: i32) -> Result<CompressedWriter<W>> {
    Ok(CompressedWriter::Zstd(zstd::stream::write::Encoder::new(
        inner, level,
    )?))
}

#[cfg(not(feature = "zstd"))]
fn zstd_writer<W: Write>(_inner: W, _level: i32) -> Result<CompressedWriter<W>> {
    Err(unsupported(CompressionFormat::Zstd))
}

impl<W: Write> Write for CompressedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressedWriter::Plain(inner) => inner.write(buf),
            #[cfg(feature = "xz")]
            CompressedWriter::Xz(encoder) => encoder.write(buf),
            #[cfg(feature = "zstd")]
            CompressedWriter::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressedWriter::Plain(inner) => inner.flush(),
            #[cfg(feature = "xz")]
            CompressedWriter::Xz(encoder) => encoder.flush(),
            #[cfg(feature = "zstd")]
            CompressedWriter::Zstd(encoder) => encoder.flush(),
        }
    }
}

/// Wrap `reader` in the decoder matching its leading magic bytes
pub(crate) fn open_decoder<R: BufRead + 'static>(
    mut reader: R,
) -> Result<(Box<dyn Read>, Option<CompressionFormat>)> {
    let detected = CompressionFormat::detect(reader.fill_buf()?);
    let stream: Box<dyn Read> = match detected {
        None => Box::new(reader),
        Some(CompressionFormat::Xz) => xz_reader(reader)?,
        Some(CompressionFormat::Zstd) => zstd_reader(reader)?,
    };
    Ok((stream, detected))
}

#[cfg(feature = "xz")]
fn xz_reader<R: BufRead + 'static>(reader: R) -> Result<Box<dyn Read>> {
    Ok(Box::new(xz2::bufread::XzDecoder::new_multi_decoder(reader)))
}

#[cfg(not(feature = "xz"))]
fn xz_reader<R: BufRead + 'static>(_reader: R) -> Result<Box<dyn Read>> {
    Err(unsupported(CompressionFormat::Xz))
}

#[cfg(feature = "zstd")]
fn zstd_reader<R: BufRead + 'static>(reader: R) -> Result<Box<dyn Read>> {
    Ok(Box::new(zstd::stream::read::Decoder::with_buffer(reader)?))
}

#[cfg(not(feature = "zstd"))]
fn zstd_reader<R: BufRead + 'static>(_reader: R) -> Result<Box<dyn Read>> {
    Err(unsupported(CompressionFormat::Zstd))
}
