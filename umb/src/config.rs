//! Export configuration

use umb_core::{CompressionFormat, DEFAULT_COMPRESSION};

/// Default size of the staging buffer array encoders fill per read
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Buffer size used when reading archive entries
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Settings used when writing a UMB file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Whole-stream compression, `None` for a plain tar
    pub compression: Option<CompressionFormat>,
    /// xz preset level (0-9)
    pub xz_preset: u32,
    /// zstd compression level
    pub zstd_level: i32,
    /// Bytes encoded per refill of an array's staging buffer
    pub buffer_size: usize,
}

impl ExportConfig {
    /// Plain tar output
    pub fn uncompressed() -> Self {
        Self::default().with_compression(None)
    }

    /// Set the compression format
    pub fn with_compression(mut self, compression: Option<CompressionFormat>) -> Self {
        self.compression = compression;
        self
    }

    /// Set the xz preset level
    pub fn with_xz_preset(mut self, preset: u32) -> Self {
        self.xz_preset = preset.min(9);
        self
    }

    /// Set the zstd compression level
    pub fn with_zstd_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }

    /// Set the staging buffer size (at least one 8-byte element)
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(8);
        self
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            compression: Some(DEFAULT_COMPRESSION),
            xz_preset: 6,
            zstd_level: 3,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}
