//! zipease - small facades for creating and extracting ZIP archives
//!
//! [`ArchiveWriter`] builds an archive from files, buffers and folders;
//! [`ArchiveReader`] lists and extracts the entries of an existing one. The
//! container format itself is handled by the `zip` crate behind the
//! [`codec`] traits.

pub mod codec;
pub mod config;
pub mod error;
pub mod paths;
pub mod reader;
pub mod report;
pub mod writer;

pub use error::{Error, Result};

// Re-export commonly used types
pub use codec::{ArchiveSink, ArchiveSource, EntryInfo, ZipSink, ZipSource};
pub use config::{Compression, Config, ReaderConfig, WriterConfig};
pub use reader::ArchiveReader;
pub use report::{EntryFailure, ExtractReport};
pub use writer::ArchiveWriter;
