//! Error types for zipease-core

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for the zipease library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip codec rejected an operation
    #[error("Zip error: {0}")]
    Zip(String),

    /// Invalid file or directory path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File already exists at destination
    #[error("File exists: {0}")]
    FileExists(PathBuf),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Central directory repeats entry names
    #[error("Archive repeats entry names: {0} duplicate record(s)")]
    DuplicateEntries(usize),

    /// Entry is encrypted and cannot be read
    #[error("Entry is encrypted: {0}")]
    Encrypted(String),

    /// Writer skipped the operation because an earlier one failed
    #[error("Writer is in a failed state, operation skipped")]
    WriterFailed,

    /// Writer was already flushed
    #[error("Archive already finalized")]
    Finalized,

    /// Reader could not open its archive
    #[error("Archive reader unavailable: {0}")]
    ReaderUnavailable(String),

    /// Some operations failed during batch processing
    #[error("Partial failure: {failed} failed, {skipped} skipped")]
    PartialFailure { failed: usize, skipped: usize },
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Zip(err.to_string())
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::Io(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
