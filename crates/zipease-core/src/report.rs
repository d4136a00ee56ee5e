//! Failure records and extraction reports

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One operation that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    /// Entry name, or the filesystem path when no entry name applies
    pub name: String,
    /// Human readable cause
    pub reason: String,
}

impl EntryFailure {
    pub fn new(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

/// Outcome of extracting every entry of an archive
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractReport {
    /// Files and directories written, in archive order
    pub extracted: Vec<PathBuf>,
    /// Entries left alone because they are encrypted
    pub skipped_encrypted: Vec<String>,
    /// Entries that failed
    pub failures: Vec<EntryFailure>,
}

impl ExtractReport {
    /// True when no entry failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
