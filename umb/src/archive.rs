//! Archive container for UMB files
//!
//! A UMB file is a tar archive, optionally wrapped in whole-stream
//! compression, holding `index.json` and any number of binary entries.

mod compression;
mod reader;
mod writer;

pub use reader::{ArchiveReader, EntryReader};
pub use writer::ArchiveWriter;
