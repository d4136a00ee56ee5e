//! Archive codec seam
//!
//! The facades never touch the container format directly. Writing goes
//! through an [`ArchiveSink`], reading through an [`ArchiveSource`]; the
//! default implementations wrap the `zip` crate.

pub mod zip;

#[cfg(test)]
pub(crate) mod memory;

use crate::config::WriterConfig;
use crate::Result;
use serde::Serialize;
use std::io::{Read, Write};

pub use self::zip::{ZipSink, ZipSource};

/// Metadata of one entry as reported by the codec
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    /// Position in the central directory
    pub index: usize,
    /// Name inside the archive
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Compressed size in bytes
    pub compressed_size: u64,
    /// Whether this is a directory entry
    pub is_dir: bool,
    /// Whether the entry is encrypted
    pub encrypted: bool,
}

/// Write side of a codec
pub trait ArchiveSink {
    /// Add one entry whose content is read from `source`, returning the bytes written
    fn add_stream(&mut self, name: &str, source: &mut dyn Read, config: &WriterConfig)
        -> Result<u64>;

    /// Add one entry from an in-memory buffer
    fn add_bytes(&mut self, name: &str, data: &[u8], config: &WriterConfig) -> Result<()> {
        let mut reader = data;
        self.add_stream(name, &mut reader, config).map(|_| ())
    }

    /// Write the central directory and release the underlying handle
    ///
    /// Calling it again after success does nothing.
    fn finish(&mut self) -> Result<()>;
}

/// Read side of a codec
pub trait ArchiveSource {
    /// Number of entries in the central directory
    fn len(&self) -> usize;

    /// Whether the archive has no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata for the entry at `index`
    fn entry(&mut self, index: usize) -> Result<EntryInfo>;

    /// Index of the first entry named exactly `name`
    fn index_of(&self, name: &str) -> Option<usize>;

    /// Decode the entry at `index` into `out`, returning the bytes written
    fn extract_to(&mut self, index: usize, out: &mut dyn Write) -> Result<u64>;
}
